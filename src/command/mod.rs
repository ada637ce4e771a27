pub mod bus;
pub mod types;

pub use bus::{CommandBus, CommandReceiver, CommandSender, COMMAND_CAPACITY};
pub use types::GraphCommand;
