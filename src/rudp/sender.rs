use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::str::FromStr;

use super::{valid_header, Flags, Header, HEADER_LEN, MSS};
use crate::{Error, LogLevel, Logger, NoopLogger, RudpConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SenderState {
    SynSent,
    Established,
    FinSent,
    Closed,
}

pub struct RudpSender {
    socket: UdpSocket,
    peer: SocketAddr,
    config: RudpConfig,
    logger: Box<dyn Logger>,
    state: SenderState,
}

impl RudpSender {
    pub fn open_sender(address: &str, port: u16) -> Result<Self, Error> {
        Self::open_sender_with(address, port, RudpConfig::default(), Box::new(NoopLogger))
    }

    pub fn open_sender_with(
        address: &str,
        port: u16,
        config: RudpConfig,
        logger: Box<dyn Logger>,
    ) -> Result<Self, Error> {
        let peer_addr =
            std::net::Ipv4Addr::from_str(address).map_err(Error::InvalidAddress)?;
        let peer = SocketAddr::V4(SocketAddrV4::new(peer_addr, port));

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(config.ack_timeout))?;
        socket.connect(peer)?;

        let mut sender = RudpSender {
            socket,
            peer,
            config,
            logger,
            state: SenderState::SynSent,
        };

        let mut syn = Header {
            len: 0,
            flags: Flags::SYN,
            checksum: 0,
            segment_num: 0,
        };
        let mut msg = [0u8; HEADER_LEN];
        syn.encode(&mut msg);
        syn.set_checksum(&mut msg);

        let mut reply = [0u8; HEADER_LEN];
        for attempt in 0..sender.config.max_retries {
            if sender.socket.send(&msg)? != HEADER_LEN {
                continue;
            }

            if let Ok(n) = sender.socket.recv(&mut reply) {
                if let Some(header) = valid_header(&reply, n) {
                    if header.flags.contains(Flags::ACK) {
                        sender.state = SenderState::Established;
                        return Ok(sender);
                    }
                }
            }

            sender.logger.log(
                LogLevel::Warn,
                &format!("open_sender: SYN attempt {} failed, retrying", attempt + 1),
            );
        }

        Err(Error::RetriesExhausted(sender.config.max_retries))
    }

    // One scratch buffer, reused for every segment so segmentation does
    // not allocate per segment.
    pub fn send(&mut self, data: &[u8]) -> Result<u32, Error> {
        debug_assert_eq!(self.state, SenderState::Established);

        let segment_count = data.len().div_ceil(MSS).max(1);
        if segment_count > u16::MAX as usize + 1 {
            return Err(Error::SegmentNumberOverflow {
                size: data.len(),
                mss: MSS,
            });
        }

        let mut scratch = vec![0u8; HEADER_LEN + data.len().min(MSS).max(1)];

        let mut total_sent = 0usize;
        let mut segment_num: u16 = 0;

        loop {
            let remaining = data.len() - total_sent;
            let segment_size = remaining.min(MSS);
            let more = segment_size < remaining;

            scratch[HEADER_LEN..HEADER_LEN + segment_size]
                .copy_from_slice(&data[total_sent..total_sent + segment_size]);

            self.send_segment(&mut scratch[..HEADER_LEN + segment_size], segment_num, more)?;

            total_sent += segment_size;
            segment_num = segment_num.wrapping_add(1);

            if total_sent >= data.len() {
                break;
            }
        }

        Ok(total_sent as u32)
    }

    pub fn send_raw(&mut self, data: &[u8]) -> i64 {
        self.send(data).map(|n| n as i64).unwrap_or(-1)
    }

    fn send_segment(
        &mut self,
        message: &mut [u8],
        segment_num: u16,
        more: bool,
    ) -> Result<usize, Error> {
        let size = message.len() - HEADER_LEN;

        let mut header = Header {
            len: size as u16,
            flags: if more { Flags::MOR } else { Flags::empty() },
            checksum: 0,
            segment_num,
        };
        let mut head_bytes = [0u8; HEADER_LEN];
        header.encode(&mut head_bytes);
        message[..HEADER_LEN].copy_from_slice(&head_bytes);
        header.set_checksum(message);

        let mut ack = [0u8; HEADER_LEN];

        for attempt in 0..self.config.max_retries {
            match self.socket.send(message) {
                Ok(n) if n == message.len() => {}
                _ => continue,
            }

            if let Ok(n) = self.socket.recv(&mut ack) {
                if let Some(reply) = valid_header(&ack, n) {
                    if reply.flags.contains(Flags::ACK) && reply.segment_num == segment_num {
                        return Ok(size);
                    }
                }
            }

            self.logger.log(
                LogLevel::Warn,
                &format!(
                    "send_segment: segment {segment_num} attempt {} failed, retrying",
                    attempt + 1
                ),
            );
        }

        Err(Error::RetriesExhausted(self.config.max_retries))
    }

    pub fn close_sender(&mut self) {
        if self.state == SenderState::Closed {
            return;
        }

        self.state = SenderState::FinSent;

        let mut fin = Header {
            len: 0,
            flags: Flags::FIN,
            checksum: 0,
            segment_num: 0,
        };
        let mut msg = [0u8; HEADER_LEN];
        fin.encode(&mut msg);
        fin.set_checksum(&mut msg);

        let mut reply = [0u8; HEADER_LEN];
        let mut closed_cleanly = false;

        for _ in 0..self.config.max_retries {
            if self.socket.send(&msg).is_err() {
                continue;
            }

            if let Ok(n) = self.socket.recv(&mut reply) {
                if let Some(header) = valid_header(&reply, n) {
                    if header.flags.contains(Flags::FIN) && header.flags.contains(Flags::ACK) {
                        closed_cleanly = true;
                        break;
                    }
                }
            }
        }

        if !closed_cleanly {
            self.logger.log(
                LogLevel::Warn,
                "close_sender: retries exhausted waiting for FIN-ACK, closing locally",
            );
        }

        self.state = SenderState::Closed;
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for RudpSender {
    fn drop(&mut self) {
        self.close_sender();
    }
}
