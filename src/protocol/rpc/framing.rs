//! Record-marking framing for RPC-over-TCP, RFC 5531 section 11 (previously
//! RFC 1057 section 10).
//!
//! Each RPC record is split into one or more fragments; every fragment is
//! prefixed by a 4-byte header whose high bit is the "last fragment" flag and
//! whose low 31 bits are the fragment length. The teacher's server-side
//! `protocol::rpc::wire` reads a stream of incoming records this way; this
//! client needs the same framing in both directions, since every call it
//! writes and every reply it reads over TCP must be record-marked.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum size in bytes this client accepts for one reassembled RPC record,
/// guarding against a misbehaving server claiming an unbounded fragment.
pub const MAX_RPC_RECORD_LENGTH: usize = 16 * 1024 * 1024;

/// Largest payload one fragment can carry: the low 31 bits of the header.
const MAX_FRAGMENT_SIZE: usize = (1 << 31) - 1;

/// Writes `buf` to `stream` as one or more record-marked fragments.
pub async fn write_record<W: AsyncWrite + Unpin>(
    stream: &mut W,
    buf: &[u8],
) -> std::io::Result<()> {
    let mut offset = 0;
    loop {
        let remaining = buf.len() - offset;
        let fragment_size = remaining.min(MAX_FRAGMENT_SIZE);
        let is_last = offset + fragment_size >= buf.len();
        let header = if is_last {
            fragment_size as u32 | (1 << 31)
        } else {
            fragment_size as u32
        };
        stream.write_all(&header.to_be_bytes()).await?;
        stream.write_all(&buf[offset..offset + fragment_size]).await?;
        offset += fragment_size;
        if is_last {
            return Ok(());
        }
    }
}

/// Reads one complete record-marked RPC record from `stream`, reassembling
/// fragments until the last-fragment bit is set.
pub async fn read_record<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<Vec<u8>> {
    let mut record = Vec::new();
    loop {
        let mut header_buf = [0u8; 4];
        stream.read_exact(&mut header_buf).await?;
        let header = u32::from_be_bytes(header_buf);
        let is_last = header & (1 << 31) != 0;
        let length = (header & ((1 << 31) - 1)) as usize;
        if record.len().saturating_add(length) > MAX_RPC_RECORD_LENGTH {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("RPC record exceeds max length {MAX_RPC_RECORD_LENGTH}"),
            ));
        }
        let start = record.len();
        record.resize(start + length, 0);
        stream.read_exact(&mut record[start..]).await?;
        if is_last {
            return Ok(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_fragment_roundtrips() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let payload = vec![1u8, 2, 3, 4, 5];
        write_record(&mut a, &payload).await.unwrap();
        let got = read_record(&mut b).await.unwrap();
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn empty_record_roundtrips() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        write_record(&mut a, &[]).await.unwrap();
        let got = read_record(&mut b).await.unwrap();
        assert!(got.is_empty());
    }
}
