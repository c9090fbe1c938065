//! Binary position-update frame
//!
//! Layout, all little endian:
//!
//! ```text
//! tick:  u64
//! self:  x f32, y f32
//! count: u32
//! count * (id u64, x f32, y f32)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::game::interest::{PlayerSnapshot, UpdateFrame};
use crate::game::player::ConnectionId;

const HEADER_LEN: usize = 8 + 4 + 4 + 4;
const ENTRY_LEN: usize = 8 + 4 + 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("{0} trailing bytes after frame")]
    Trailing(usize),
}

pub fn encode(frame: &UpdateFrame) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + frame.nearby.len() * ENTRY_LEN);
    buf.put_u64_le(frame.tick);
    buf.put_f32_le(frame.own_x);
    buf.put_f32_le(frame.own_y);
    buf.put_u32_le(frame.nearby.len() as u32);
    for p in &frame.nearby {
        buf.put_u64_le(p.id.0);
        buf.put_f32_le(p.x);
        buf.put_f32_le(p.y);
    }
    buf.freeze()
}

pub fn decode(mut bytes: &[u8]) -> Result<UpdateFrame, FrameError> {
    ensure(bytes, HEADER_LEN)?;
    let tick = bytes.get_u64_le();
    let own_x = bytes.get_f32_le();
    let own_y = bytes.get_f32_le();
    let count = bytes.get_u32_le() as usize;

    ensure(bytes, count.saturating_mul(ENTRY_LEN))?;
    let mut nearby = Vec::with_capacity(count);
    for _ in 0..count {
        nearby.push(PlayerSnapshot {
            id: ConnectionId(bytes.get_u64_le()),
            x: bytes.get_f32_le(),
            y: bytes.get_f32_le(),
        });
    }

    if !bytes.is_empty() {
        return Err(FrameError::Trailing(bytes.len()));
    }

    Ok(UpdateFrame {
        tick,
        own_x,
        own_y,
        nearby,
    })
}

fn ensure(bytes: &[u8], needed: usize) -> Result<(), FrameError> {
    if bytes.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}
