//! Field codec: channel naming, encoding selection and array conversion.
//!
//! - [`channel`] - channel vocabulary and `<owner>_<channel>` ids
//! - [`encoding`] - the ten [`FieldEncoding`] descriptors and session storage config
//! - [`transform`] - local-to-world mapping of written fields
//! - [`resolver`] - which encoding a stored channel uses, and the file's grid size
//! - [`array`] - flat host arrays to typed fields and back

pub mod array;
pub mod channel;
pub mod encoding;
pub mod resolver;
pub mod transform;
mod typed;

pub use array::{array_size, decode, encode, Source, StaggeredLayout, SPARSE_THRESHOLD};
pub use channel::{channel_id, ChannelId, ChannelKind, ChannelShape, CHANNEL_SEPARATOR};
pub use encoding::{BoundsCheck, FieldEncoding, Representation, SessionConfig, StorageConfig};
pub use resolver::{field_names, fields_resolution, load_field, resolve_encoding};
pub use transform::compose;
pub use typed::TypedField;
