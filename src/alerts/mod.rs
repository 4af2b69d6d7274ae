pub mod dispatcher;
pub mod messenger;
pub mod render;
pub mod store;

pub use dispatcher::AlertDispatcher;
pub use store::AlertStore;
