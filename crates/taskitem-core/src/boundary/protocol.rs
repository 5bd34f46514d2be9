//! Line protocol spoken across every isolation boundary
//!
//! One JSON document per line. The near side sends [`HostRequest`]s; the far
//! side answers each with exactly one [`HostResponse`].

use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    codec::{self, ItemSnapshot},
    context::ItemContext,
    item::BuildItem,
    metadata::MetadataValue,
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum HostRequest {
    /// Build one item per include, each seeded with `metadata`
    CreateItems {
        includes: Vec<String>,
        #[serde(default)]
        metadata: IndexMap<String, MetadataValue>,
    },
    /// Stop serving after acknowledging
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum HostResponse {
    Items { items: Vec<ItemSnapshot> },
    Failed { message: String },
    Closed,
}

/// Answer one request on the far side.
pub fn serve_request(request: HostRequest, context: &Arc<ItemContext>) -> HostResponse {
    match request {
        HostRequest::CreateItems { includes, metadata } => includes
            .into_iter()
            .map(|include| {
                BuildItem::with_metadata(include, metadata.clone())
                    .map(|item| codec::export(&item.in_context(Arc::clone(context))))
            })
            .collect::<Result<Vec<_>>>()
            .map_or_else(
                |e| HostResponse::Failed {
                    message: e.to_string(),
                },
                |items| HostResponse::Items { items },
            ),
        HostRequest::Shutdown => HostResponse::Closed,
    }
}

/// Write `message` as one line and flush.
///
/// # Errors
///
/// Returns error if serialization or the write fails.
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read the next line as a message; `None` at end of input.
///
/// # Errors
///
/// Returns error if reading fails or the line is not a valid message.
pub fn read_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return Ok(Some(serde_json::from_str(line.trim_end())?));
        }
    }
}

/// Serve requests from `reader` until end of input or a shutdown request.
/// Returns the number of requests answered.
///
/// Malformed requests are answered with [`HostResponse::Failed`] rather than
/// ending the session.
///
/// # Errors
///
/// Returns error if the underlying reader or writer fails.
pub fn serve<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    context: &Arc<ItemContext>,
) -> Result<usize> {
    let mut served = 0;
    loop {
        let request = match read_message::<_, HostRequest>(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(Error::Codec(message)) => {
                tracing::warn!("Rejected malformed request: {message}");
                write_message(&mut writer, &HostResponse::Failed { message })?;
                served += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(?request, "serving request");
        let response = serve_request(request, context);
        write_message(&mut writer, &response)?;
        served += 1;

        if response == HostResponse::Closed {
            break;
        }
    }
    Ok(served)
}
