//! Telnet byte-stream decoder
//!
//! Detector controllers run a minimal telnetd that opens with a burst of
//! option negotiation before the shell prompt. We accept no options:
//! ```text
//! IAC DO   <opt>  ->  IAC WONT <opt>
//! IAC WILL <opt>  ->  IAC DONT <opt>
//! IAC DONT/WONT   ->  (nothing)
//! IAC SB ... IAC SE  dropped
//! IAC IAC         ->  literal 0xFF
//! CR NUL          ->  CR
//! ```

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

const CR: u8 = b'\r';
const NUL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    /// Previous byte was a data CR
    Cr,
    /// Previous byte was IAC
    Iac,
    /// Waiting for the option byte of DO/DONT/WILL/WONT
    Negotiate(u8),
    /// Inside a subnegotiation
    Subneg,
    /// IAC seen inside a subnegotiation
    SubnegIac,
}

/// Result of decoding one chunk of the byte stream
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Application data with telnet commands removed
    pub data: Vec<u8>,
    /// Bytes to write back to the peer (negotiation refusals)
    pub replies: Vec<u8>,
}

/// Incremental telnet decoder; command sequences may span chunks
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    state: State,
}

impl TelnetDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk received from the peer
    pub fn decode(&mut self, input: &[u8]) -> Decoded {
        let mut out = Decoded::default();

        for &byte in input {
            self.state = match self.state {
                State::Data => Self::data_byte(byte, &mut out),
                State::Cr => {
                    if byte == NUL {
                        State::Data
                    } else {
                        Self::data_byte(byte, &mut out)
                    }
                }
                State::Iac => match byte {
                    IAC => {
                        out.data.push(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Negotiate(byte),
                    SB => State::Subneg,
                    // NOP, GA, AYT and friends carry no payload
                    _ => State::Data,
                },
                State::Negotiate(command) => {
                    match command {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    tracing::trace!(command, option = byte, "telnet negotiation");
                    State::Data
                }
                State::Subneg => {
                    if byte == IAC {
                        State::SubnegIac
                    } else {
                        State::Subneg
                    }
                }
                State::SubnegIac => {
                    if byte == SE {
                        State::Data
                    } else {
                        State::Subneg
                    }
                }
            };
        }

        out
    }

    fn data_byte(byte: u8, out: &mut Decoded) -> State {
        match byte {
            IAC => State::Iac,
            CR => {
                out.data.push(CR);
                State::Cr
            }
            _ => {
                out.data.push(byte);
                State::Data
            }
        }
    }
}

/// Escape outgoing data so literal 0xFF bytes are not read as IAC
pub fn escape_outgoing(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}
