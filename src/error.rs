// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the error and status types used throughout the crate.
//!
//! Two distinct vocabularies are exposed on purpose. [`Status`] is what the frame parser
//! itself returns: a closed, four-way outcome (`Ok`/`Incomplete`/`Invalid`/`NoSync`) that a
//! streaming caller can match on without ever seeing an `Err`. [`Error`]/[`Result`] is the
//! `std::io`-flavored vocabulary the adapters (`StreamReader`, `DtsUhdReader`) use, since they
//! wrap an actual `Read`/`Seek` source and need to propagate I/O failure alongside parse failure.

use std::fmt;
use std::io;

/// The outcome of parsing a single frame from the head of a buffer.
///
/// Mirrors the bitstream-level taxonomy directly: a non-sync frame observed before any sync
/// frame is `NoSync` rather than `Invalid`, since the caller can recover by continuing to scan
/// for a sync frame instead of discarding the whole stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// The frame was fully present in the buffer and parsed successfully.
    Ok,
    /// The buffer does not yet contain a complete frame; the caller should supply more bytes.
    Incomplete,
    /// The frame's bytes were present but failed validation (CRC mismatch, contradictory field).
    Invalid,
    /// A non-sync frame was encountered before any sync frame had been recognized.
    NoSync,
}

/// `Error` enumerates the failure modes an adapter built on top of the frame parser can report.
#[derive(Debug)]
pub enum Error {
    /// The stream contained malformed data and could not be parsed.
    DecodeError(&'static str),
    /// The buffer did not contain a complete frame and no more input is available.
    Incomplete,
    /// A non-sync frame was seen before any sync frame.
    NoSync,
    /// The caller passed a missing or empty buffer where one was required.
    Null(&'static str),
    /// An I/O error occurred while reading, writing, or seeking the underlying source.
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DecodeError(msg) => write!(f, "malformed stream: {}", msg),
            Error::Incomplete => write!(f, "incomplete frame"),
            Error::NoSync => write!(f, "non-sync frame before initial sync"),
            Error::Null(what) => write!(f, "null argument: {}", what),
            Error::IoError(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DecodeError(desc))
}

/// Convenience function to create a null-argument error.
pub fn null_error<T>(what: &'static str) -> Result<T> {
    Err(Error::Null(what))
}

impl Status {
    /// Convert a [`Status`] other than `Ok` into the matching [`Error`] variant.
    ///
    /// Panics if called on `Status::Ok`; callers are expected to have already branched on the
    /// success case before needing the error conversion.
    pub fn into_error(self) -> Error {
        match self {
            Status::Ok => unreachable!("Status::Ok has no matching Error"),
            Status::Incomplete => Error::Incomplete,
            Status::Invalid => Error::DecodeError("invalid frame"),
            Status::NoSync => Error::NoSync,
        }
    }
}
