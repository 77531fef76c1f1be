pub mod dispatcher;
pub mod event;
pub mod history;
pub mod intent;
pub mod reactor;
pub mod session;
pub mod speech;
pub mod turn;
