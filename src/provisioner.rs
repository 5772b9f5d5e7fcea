//! One run of `devconf`: find the board, obtain what to write to it and run
//! the provisioning protocol.
//!
//! **Example** - Running the provisioner with the interactive console:
//! ```no_run
//! use devconf::{ConsoleOperator, Provisioner, SerialTransport, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().finalize();
//! let mut transport = SerialTransport::new();
//! let mut operator = ConsoleOperator::new();
//! let configured = Provisioner::new(&settings, &mut transport, &mut operator).run();
//! println!("configured: {:?}", configured.is_ok());
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::Provisioner;
