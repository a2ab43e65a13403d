#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Wire framing and message decoding for the LiveSync file push protocol.
//!
//! A desktop tool pushes file changes to a running debug build over a local
//! socket. Each connection carries zero or more messages back to back, with
//! no delimiter beyond the declared lengths:
//!
//! | Field | Width | Encoding |
//! |---|---|---|
//! | operation | 1 | ASCII digit, `7` delete / `8` create |
//! | fileNameLength | 5 | zero-padded decimal |
//! | fileName | fileNameLength | text, trimmed |
//! | fileContentLength | 10 | zero-padded decimal (create only) |
//! | fileContent | fileContentLength | raw bytes (create only) |
//!
//! The crate is split into the fixed-size [`read_frame`] primitive, the
//! [`MessageDecoder`] state machine built on top of it, and the matching
//! encoder used by senders and tests. Decoding failures are reported as
//! [`DecodeError`] values tagged with an [`ErrorKind`]; parse-class errors
//! carry the [`PROTOCOL_USAGE`] reminder in their rendered message.
//!
//! # Examples
//!
//! ```
//! use protocol::{MessageDecoder, Operation};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), protocol::DecodeError> {
//! let wire = Operation::create("./a.txt", b"fileContent".to_vec())
//!     .to_wire()
//!     .expect("short names always encode");
//! assert_eq!(wire, b"800007./a.txt0000000011fileContent");
//!
//! let mut decoder = MessageDecoder::new(wire.as_slice());
//! let decoded = decoder.next_operation().await?;
//! assert_eq!(decoded, Some(Operation::create("./a.txt", b"fileContent".to_vec())));
//! # Ok(())
//! # }
//! ```

mod decode;
mod encode;
mod error;
mod field;
mod frame;
mod operation;
mod usage;

pub use decode::{MessageDecoder, decode_file_name, parse_length};
pub use encode::{EncodeError, write_batch};
pub use error::{DecodeError, ErrorKind, RawByte};
pub use field::{
    CONTENT_LENGTH_WIDTH, DEFAULT_MAX_CONTENT_LENGTH, FILE_NAME_LENGTH_WIDTH, FrameField,
    MAX_FILE_NAME_LENGTH, OPERATION_WIDTH, OperationCode,
};
pub use frame::{has_pending_input, read_frame};
pub use operation::Operation;
pub use usage::PROTOCOL_USAGE;
