//! Raw bodies read as they arrive.

use std::collections::HashMap;
use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::classify::{TransportError, classify_transport};
use crate::{Error, Response, Result};

/// Body chunks as the transport yields them.
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// A body already in memory, as a stream.
#[must_use]
pub fn once(body: Bytes) -> ByteStream {
    stream::iter((!body.is_empty()).then_some(Ok(body))).boxed()
}

/// Read every chunk into one buffer.
///
/// # Errors
///
/// Returns the first transport failure.
pub async fn collect(body: ByteStream) -> std::result::Result<Bytes, TransportError> {
    body.try_fold(BytesMut::new(), |mut buffer, chunk| async move {
        buffer.extend_from_slice(&chunk);
        Ok(buffer)
    })
    .await
    .map(BytesMut::freeze)
}

/// A successful file download.
///
/// Nothing past the response head has been read yet.
pub struct Download {
    response: Response<ByteStream>,
}

impl Download {
    pub(crate) const fn new(response: Response<ByteStream>) -> Self {
        Self { response }
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        self.response.headers()
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    /// The body, chunk by chunk. A transport failure ends the stream.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        self.response
            .into_body()
            .map_err(|error| Error::from(classify_transport(&error)))
            .boxed()
    }

    /// The whole body.
    ///
    /// # Errors
    ///
    /// Returns the classified transport failure.
    pub async fn bytes(self) -> Result<Bytes> {
        collect(self.response.into_body())
            .await
            .map_err(|error| Error::from(classify_transport(&error)))
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("status", &self.response.status())
            .finish_non_exhaustive()
    }
}
