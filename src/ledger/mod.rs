//! Hardware device support.
//!
//! # Data Flow
//! ```text
//! TransactionIntent
//!     → translator.rs (body → DevicePayload, gated by capabilities.rs)
//!     → device.rs (session lock, retries, cancellation)
//!     → channel.rs (APDU frames, status words)
//!     → DeviceChannel (injected transport)
//! ```
//!
//! # Responsibilities
//! - Decide what the device can display for a given firmware version
//! - Fail closed when it cannot, never silently drop information
//! - Keep one outstanding request per device
//!
//! # Design Decisions
//! - Capability table is static data with a single comparison function
//! - Blind-signing setting is cached per firmware version

pub mod capabilities;
pub mod channel;
pub mod device;
pub mod jettons;
pub mod parser;
pub mod payload;
pub mod translator;
pub mod version;

pub use capabilities::{supports, Feature};
pub use channel::{Apdu, ChannelError, DeviceChannel, DeviceError, DeviceModel};
pub use device::{CancelHandle, DerivationPath, DeviceSession, LedgerDevice};
pub use jettons::{JettonRegistry, TokenResolver};
pub use parser::{OpcodeParser, ParseError, PayloadParser};
pub use payload::{DevicePayload, JettonIdentification};
pub use translator::{PayloadTranslator, TranslateError, TranslationContext};
pub use version::DeviceVersion;
