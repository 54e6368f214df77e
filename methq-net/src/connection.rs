//! Per-connection request handling.
//!
//! Each accepted socket is driven by exactly one tokio task, which gives
//! the strand property for free: no two steps of one connection ever run
//! concurrently. The connection is a strict linear pass: read header,
//! read payload when the request type has one, dispatch, write header,
//! write body on success, close. Any parse or dispatch failure sets a
//! status code, skips the body and still writes the header. Every I/O
//! quantum re-arms the inactivity deadline; an expired deadline makes one
//! best-effort attempt to report a status before closing the socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use methq_index::{IndexSet, OffsetRange};
use methq_methylome::LevelsPayload;

use crate::HEADER_SIZE;
use crate::methylome_set::{MethylomeSet, MethylomeSetError};
use crate::request::{RequestHeader, decode_query};
use crate::response::{ResponseHeader, encode_levels};
use crate::status::Status;

/// Everything a connection needs from the server, shared across tasks.
/// The index set is immutable after startup; the methylome set does its
/// own locking.
pub struct ServerContext {
    pub indexes: IndexSet,
    pub methylomes: MethylomeSet,
    pub min_bin_size: u32,
    pub max_intervals: u32,
    pub idle_timeout: Duration,
}

enum ConnClose {
    /// Deadline expired with no bytes moved: the peer went quiet.
    Idle,
    /// Frame ended early, either EOF or a deadline mid-frame.
    ShortFrame,
    /// Socket error; nothing more to say to this peer.
    Io(std::io::Error),
}

pub async fn handle_connection(mut stream: TcpStream, peer: std::net::SocketAddr, ctx: Arc<ServerContext>) {
    let started = std::time::Instant::now();

    let mut header_buf = [0u8; HEADER_SIZE];
    match read_exact_deadline(&mut stream, &mut header_buf, ctx.idle_timeout).await {
        Ok(()) => {}
        Err(ConnClose::Idle) => {
            tracing::debug!(%peer, "connection idle before request; closing");
            finish_with_error(&mut stream, &ctx, Status::InactiveTimeout).await;
            return;
        }
        Err(ConnClose::ShortFrame) => {
            tracing::debug!(%peer, "short request header; closing");
            finish_with_error(&mut stream, &ctx, Status::BadRequest).await;
            return;
        }
        Err(ConnClose::Io(error)) => {
            tracing::debug!(%peer, %error, "error reading request header");
            return;
        }
    }

    let header = match RequestHeader::decode(&header_buf) {
        Ok(header) => header,
        Err(error) => {
            tracing::debug!(%peer, %error, "request header failed to parse");
            finish_with_error(&mut stream, &ctx, Status::BadRequest).await;
            return;
        }
    };
    tracing::info!(
        %peer,
        rq_type = ?header.rq_type,
        n_methylomes = header.methylome_names.len(),
        aux = header.aux,
        "request"
    );

    match dispatch(&mut stream, &header, &ctx).await {
        Ok((response_size, bodies)) => {
            let response = ResponseHeader {
                status: Status::Ok,
                response_size,
            };
            if let Err(error) = write_response(&mut stream, &ctx, &response, &bodies).await {
                tracing::debug!(%peer, %error, "error writing response");
                return;
            }
            tracing::info!(
                %peer,
                response_size,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request served"
            );
        }
        Err(status) => {
            tracing::info!(%peer, %status, "request failed");
            finish_with_error(&mut stream, &ctx, status).await;
        }
    }
}

/// Evaluate one parsed request. Returns the per-methylome element count
/// and one encoded body per methylome, or the status to report.
async fn dispatch(
    stream: &mut TcpStream,
    header: &RequestHeader,
    ctx: &ServerContext,
) -> Result<(u32, Vec<Vec<u8>>), Status> {
    // the payload, when there is one, is consumed before any error can be
    // reported; responding with bytes still queued in the receive buffer
    // would close with RST and could destroy the response on its way out
    let query = if header.rq_type.is_intervals() {
        let n_intervals = header.aux;
        if n_intervals > ctx.max_intervals {
            drain_payload(stream, 8 * n_intervals as u64, ctx.idle_timeout).await;
            return Err(Status::TooManyIntervals);
        }
        let mut payload = vec![0u8; 8 * n_intervals as usize];
        match read_exact_deadline(stream, &mut payload, ctx.idle_timeout).await {
            Ok(()) => {}
            Err(ConnClose::Idle) => return Err(Status::InactiveTimeout),
            Err(ConnClose::ShortFrame) => return Err(Status::BadRequest),
            Err(ConnClose::Io(_)) => return Err(Status::BadRequest),
        }
        let query = decode_query(&payload, n_intervals).map_err(|error| {
            if matches!(error, crate::errors::ProtocolError::UnsortedQuery) {
                Status::UnsortedIntervals
            } else {
                Status::BadRequest
            }
        })?;
        Some(query)
    } else {
        None
    };

    let index = ctx
        .indexes
        .get_by_hash(header.index_hash)
        .ok_or(Status::IndexNotFound)?;

    let response_size = match &query {
        Some(query) => {
            if query.iter().any(|r| r.stop > index.meta.n_cpgs) {
                return Err(Status::BadRequest);
            }
            query.len() as u32
        }
        None => {
            let bin_size = header.aux;
            if bin_size < ctx.min_bin_size {
                return Err(Status::BinSizeTooSmall);
            }
            index.n_bins(bin_size)
        }
    };

    let mut bodies = Vec::with_capacity(header.methylome_names.len());
    for name in &header.methylome_names {
        let methylome = ctx.methylomes.get(name).await.map_err(|error| match error {
            MethylomeSetError::InvalidName(_) => Status::InvalidMethylomeName,
            MethylomeSetError::NotFound(_) => Status::MethylomeNotFound,
            MethylomeSetError::Load { name, source } => {
                tracing::error!(%name, %source, "methylome load failed");
                Status::ServerFailure
            }
        })?;
        // the methylome must be laid out on the very index the client
        // named; a stale or foreign hash is indistinguishable from a
        // missing index on this server
        if methylome.meta.index_hash != header.index_hash {
            return Err(Status::IndexNotFound);
        }

        let levels = compute_levels(&methylome, header, query.as_deref(), &index);
        bodies.push(encode_levels(&levels));
    }
    Ok((response_size, bodies))
}

fn compute_levels(
    methylome: &methq_methylome::Methylome,
    header: &RequestHeader,
    query: Option<&[OffsetRange]>,
    index: &methq_index::GenomeIndex,
) -> LevelsPayload {
    match (query, header.rq_type.is_covered()) {
        (Some(query), false) => LevelsPayload::Plain(methylome.data.get_levels(query)),
        (Some(query), true) => LevelsPayload::Covered(methylome.data.get_levels_covered(query)),
        (None, false) => LevelsPayload::Plain(methylome.data.get_bins(header.aux, index)),
        (None, true) => LevelsPayload::Covered(methylome.data.get_bins_covered(header.aux, index)),
    }
}

async fn write_response(
    stream: &mut TcpStream,
    ctx: &ServerContext,
    header: &ResponseHeader,
    bodies: &[Vec<u8>],
) -> std::io::Result<()> {
    write_all_deadline(stream, &header.encode(), ctx.idle_timeout).await?;
    for body in bodies {
        write_all_deadline(stream, body, ctx.idle_timeout).await?;
    }
    stream.shutdown().await
}

/// Best-effort error report: one header with the status and no body. The
/// peer may already be gone; that is fine.
async fn finish_with_error(stream: &mut TcpStream, ctx: &ServerContext, status: Status) {
    let header = ResponseHeader::error(status);
    let _ = write_all_deadline(stream, &header.encode(), ctx.idle_timeout).await;
    let _ = stream.shutdown().await;
}

/// Fill `buf` from the stream, re-arming the inactivity deadline on every
/// quantum of progress.
async fn read_exact_deadline(
    stream: &mut TcpStream,
    buf: &mut [u8],
    idle_timeout: Duration,
) -> Result<(), ConnClose> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match timeout(idle_timeout, stream.read(&mut buf[filled..])).await {
            Err(_elapsed) => {
                return Err(if filled == 0 {
                    ConnClose::Idle
                } else {
                    ConnClose::ShortFrame
                });
            }
            Ok(Ok(0)) => return Err(ConnClose::ShortFrame),
            Ok(Ok(n)) => filled += n,
            Ok(Err(error)) => return Err(ConnClose::Io(error)),
        }
    }
    Ok(())
}

/// Swallow up to `n_bytes` of a payload that will not be evaluated, so the
/// error header goes out on a clean connection. Capped: a peer declaring an
/// absurd payload gets cut off instead of drained.
async fn drain_payload(stream: &mut TcpStream, n_bytes: u64, idle_timeout: Duration) {
    const DRAIN_CAP: u64 = 1 << 20;

    let mut remaining = n_bytes.min(DRAIN_CAP);
    let mut sink = [0u8; 8 * 1024];
    while remaining > 0 {
        let quantum = sink.len().min(remaining as usize);
        match timeout(idle_timeout, stream.read(&mut sink[..quantum])).await {
            Ok(Ok(n)) if n > 0 => remaining -= n as u64,
            _ => break,
        }
    }
}

async fn write_all_deadline(
    stream: &mut TcpStream,
    bytes: &[u8],
    idle_timeout: Duration,
) -> std::io::Result<()> {
    match timeout(idle_timeout, stream.write_all(bytes)).await {
        Err(_elapsed) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "write deadline expired",
        )),
        Ok(result) => result,
    }
}
