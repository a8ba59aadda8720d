//! Protocol Module
//!
//! Defines the wire protocol between the client and the generation server.
//! Every request travels on its own TCP connection.
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: LOGIN       - Payload: JSON credentials
//! - 0x02: IMAGE       - Payload: count (4) + [len (4) + image]*
//! - 0x03: VIDEO       - Payload: raw video bytes
//! - 0x04: GET_BY_HASH - Payload: UTF-8 hash
//!
//! ### Response Formats
//! - LOGIN / GET_BY_HASH: data_len (4) + data
//! - IMAGE / VIDEO: name_len (4) + name + data_len (4) + data

mod command;
mod response;
mod codec;

pub use command::{CommandType, Request, ResponseShape};
pub use response::{Credentials, LoginResult, Response, PLACEHOLDER_NAME};
pub use codec::{
    decode_credentials, decode_image_batch, decode_login_result, encode_credentials,
    encode_image_batch, encode_length, encode_login_result, encode_request,
    encode_request_header, encode_response, error_sentinel, read_exact_bytes, read_frame,
    read_length, read_request, read_response, write_frame, write_request, write_response,
    ERROR_PREFIX, ERROR_SENTINEL_THRESHOLD, HEADER_SIZE, LENGTH_SIZE, MAX_NAME_LEN,
};
