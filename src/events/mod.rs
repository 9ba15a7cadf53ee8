//! # Events Module
//!
//! Progress events emitted by a batch.
//!
//! ## Design
//! The core library sends events through a channel, so the CLI (or any
//! other front end) can show progress without the batch knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Stage(StageEvent::Changed { stage }) => println!("{stage}"),
//!             Event::Fingerprint(FingerprintEvent::Progress(p)) => {
//!                 println!("Fingerprinted {}/{}", p.completed, p.total)
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! batch.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
