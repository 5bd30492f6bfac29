//! # Link Runtime
//!
//! Async host loop driving a [`Vehicle`] from a serial stream.
//!
//! Bytes read from the port are dispatched one at a time, timers are
//! serviced by sleeping until the next deadline, and status frames are
//! collected in an outbox and flushed to the port after every round. When
//! the shutdown future resolves or the port reaches EOF, any session is
//! unpaired fail-safe before returning.

use std::future::Future;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};

use crate::board::VehicleIo;
use crate::error::{HoverLinkError, Result};
use crate::motion::MotionActuator;
use crate::vehicle::Vehicle;

/// Serial read chunk size
const READ_CHUNK: usize = 64;

/// Run the vehicle against `port` until `shutdown` resolves or the port closes
///
/// # Errors
///
/// Returns error if reading from or writing to the port fails. The session
/// is still unpaired fail-safe in that case.
pub async fn run_link<A, B, P, F>(vehicle: &mut Vehicle<A, B>, port: &mut P, shutdown: F) -> Result<()>
where
    A: MotionActuator,
    B: VehicleIo,
    P: AsyncRead + AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let start = Instant::now();
    let mut outbox = BytesMut::with_capacity(256);

    let result = pump(vehicle, port, shutdown, start, &mut outbox).await;
    if let Err(e) = &result {
        warn!("Link loop failed: {}", e);
    }

    vehicle.shutdown(&mut (&mut outbox).writer())?;
    let flushed = flush(port, &mut outbox).await;

    info!(
        "Link stopped after {} ms, {} frames received",
        elapsed_ms(start),
        vehicle.link().frames_forwarded()
    );
    result.and(flushed)
}

async fn pump<A, B, P, F>(
    vehicle: &mut Vehicle<A, B>,
    port: &mut P,
    shutdown: F,
    start: Instant,
    outbox: &mut BytesMut,
) -> Result<()>
where
    A: MotionActuator,
    B: VehicleIo,
    P: AsyncRead + AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut buf = [0u8; READ_CHUNK];

    vehicle.run_pending(&mut (&mut *outbox).writer())?;
    flush(port, outbox).await?;

    loop {
        let deadline = vehicle
            .next_deadline()
            .map(|ms| start + Duration::from_millis(ms));

        tokio::select! {
            read = port.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    info!("Serial port closed");
                    return Ok(());
                }

                // Expire timers that fell due while we were waiting
                vehicle.advance(elapsed_ms(start));
                vehicle.run_pending(&mut (&mut *outbox).writer())?;

                debug!("RX {} bytes", n);
                vehicle.receive(&buf[..n], &mut (&mut *outbox).writer())?;
            }

            _ = wait_for(deadline) => {
                vehicle.advance(elapsed_ms(start));
                vehicle.run_pending(&mut (&mut *outbox).writer())?;
            }

            _ = &mut shutdown => {
                info!("Shutdown requested");
                return Ok(());
            }
        }

        flush(port, outbox).await?;
    }
}

/// Sleep until `deadline`, or forever when no timer is running
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Write out everything in the outbox
async fn flush<P: AsyncWrite + Unpin>(port: &mut P, outbox: &mut BytesMut) -> Result<()> {
    if outbox.is_empty() {
        return Ok(());
    }

    let pending = outbox.split();
    port.write_all(&pending)
        .await
        .map_err(|e| HoverLinkError::Serial(format!("Failed to write status frame: {}", e)))?;
    port.flush()
        .await
        .map_err(|e| HoverLinkError::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("TX {} bytes", pending.len());
    Ok(())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
