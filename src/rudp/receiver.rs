use std::net::{SocketAddr, SocketAddrV4, UdpSocket};

use socket2::{Domain, Socket, Type};

use super::{valid_header, Flags, Header, HEADER_LEN, MSS};
use crate::{Error, LogLevel, Logger, NoopLogger, RudpConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverState {
    AwaitingSyn,
    Established,
    Draining,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    Data(usize),
    Closed,
}

pub struct RudpReceiver {
    socket: UdpSocket,
    peer: SocketAddr,
    config: RudpConfig,
    logger: Box<dyn Logger>,
    state: ReceiverState,
}

impl RudpReceiver {
    pub fn open_receiver(port: u16) -> Result<Self, Error> {
        Self::open_receiver_with(port, RudpConfig::default(), Box::new(NoopLogger))
    }

    pub fn open_receiver_with(
        port: u16,
        config: RudpConfig,
        logger: Box<dyn Logger>,
    ) -> Result<Self, Error> {
        let socket = bind_any_reuseaddr(port)?;

        // Nothing to do until a sender shows up, so wait indefinitely here.
        socket.set_read_timeout(None)?;

        let mut buf = [0u8; HEADER_LEN];
        let (n, peer) = socket.recv_from(&mut buf)?;

        let header = valid_header(&buf, n).ok_or(Error::ChecksumMismatch)?;
        if !header.flags.contains(Flags::SYN) {
            return Err(Error::UnexpectedFlags(header.flags));
        }

        socket.connect(peer)?;

        let mut receiver = RudpReceiver {
            socket,
            peer,
            config,
            logger,
            state: ReceiverState::AwaitingSyn,
        };

        let mut synack = Header {
            len: 0,
            flags: Flags::SYN | Flags::ACK,
            checksum: 0,
            segment_num: 0,
        };
        let mut msg = [0u8; HEADER_LEN];
        synack.encode(&mut msg);
        synack.set_checksum(&mut msg);
        receiver.socket.send(&msg)?;

        receiver.state = ReceiverState::Established;
        Ok(receiver)
    }

    pub fn recv(&mut self, out_buffer: &mut [u8]) -> Result<RecvOutcome, Error> {
        debug_assert_eq!(self.state, ReceiverState::Established);

        // Disable the receive timeout for the first segment of this call.
        self.socket.set_read_timeout(None)?;

        let mut scratch = vec![0u8; HEADER_LEN + MSS];
        let mut total = 0usize;
        let mut expected: u16 = 0;
        let mut more = true;
        let mut first_segment = true;

        while more {
            let n = self.socket.recv(&mut scratch)?;

            if n < HEADER_LEN {
                return Err(Error::ShortDatagram {
                    got: n,
                    need: HEADER_LEN,
                });
            }

            let header = valid_header(&scratch, n).ok_or(Error::ChecksumMismatch)?;

            if first_segment {
                self.socket.set_read_timeout(Some(self.config.recv_timeout))?;
                first_segment = false;
            }

            self.ack_segment(&header)?;

            if header.flags.contains(Flags::FIN) {
                self.state = ReceiverState::Draining;
                return Ok(RecvOutcome::Closed);
            }

            if header.segment_num == expected {
                let payload = &scratch[HEADER_LEN..HEADER_LEN + header.len as usize];

                if total + payload.len() > out_buffer.len() {
                    panic!(
                        "rudp: reassembly buffer of {} bytes is too small for the incoming stream",
                        out_buffer.len()
                    );
                }

                out_buffer[total..total + payload.len()].copy_from_slice(payload);
                total += payload.len();
                expected = expected.wrapping_add(1);
            }
            // else: duplicate segment, already re-acked above, not re-appended.

            more = header.flags.contains(Flags::MOR);
        }

        Ok(RecvOutcome::Data(total))
    }

    pub fn recv_raw(&mut self, out_buffer: &mut [u8]) -> i64 {
        match self.recv(out_buffer) {
            Ok(RecvOutcome::Data(n)) => n as i64,
            Ok(RecvOutcome::Closed) => -1,
            Err(_) => -2,
        }
    }

    // Send-only retries: the receiver never waits for an ack of an ack.
    fn ack_segment(&mut self, incoming: &Header) -> Result<(), Error> {
        let mut flags = Flags::ACK;
        if incoming.flags.contains(Flags::FIN) {
            flags |= Flags::FIN;
        }
        if incoming.flags.contains(Flags::SYN) {
            flags |= Flags::SYN;
        }

        let mut ack = Header {
            len: 0,
            flags,
            checksum: 0,
            segment_num: incoming.segment_num,
        };
        let mut msg = [0u8; HEADER_LEN];
        ack.encode(&mut msg);
        ack.set_checksum(&mut msg);

        for attempt in 0..self.config.max_retries {
            match self.socket.send(&msg) {
                Ok(n) if n == HEADER_LEN => return Ok(()),
                _ => {
                    self.logger.log(
                        LogLevel::Warn,
                        &format!(
                            "ack_segment: send attempt {} for segment {} failed, retrying",
                            attempt + 1,
                            incoming.segment_num
                        ),
                    );
                }
            }
        }

        self.logger.log(
            LogLevel::Warn,
            &format!(
                "ack_segment: gave up acking segment {} after {} attempts",
                incoming.segment_num, self.config.max_retries
            ),
        );
        Ok(())
    }

    // No network exchange here: the FIN-ACK was already sent by recv when
    // the FIN arrived.
    pub fn close_receiver(&mut self) {
        self.state = ReceiverState::Closed;
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for RudpReceiver {
    fn drop(&mut self) {
        self.close_receiver();
    }
}

fn bind_any_reuseaddr(port: u16) -> Result<UdpSocket, Error> {
    let addr = SocketAddr::V4(SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, port));

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
