//! # Rolling Keystream Cipher
//!
//! Control frames are XORed with successive bytes of a 32-byte shared key.
//! Both ends keep a cursor into the key that advances once per byte and wraps
//! at 32, so a frame can only be decrypted in sequence.
//!
//! A sealed control frame is five RF bytes:
//!
//! ```text
//! [0] tag ^ k[c]   [1] drive ^ k[c+1]   [2] turn ^ k[c+2]   [3] special ^ k[c+3]
//! [4] (tag + drive + turn + special) ^ k[c+4]
//! ```

/// Shared key length
pub const KEY_LEN: usize = 32;

/// Decrypted tag of a control frame
pub const CONTROL_TAG: u8 = 0x02;

/// Bytes covered by the control checksum
const CONTROL_BODY_LEN: usize = 4;

/// RF bytes in a sealed control frame
pub const SEALED_CONTROL_LEN: usize = CONTROL_BODY_LEN + 1;

/// Decrypted control frame contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCommand {
    /// Forward positive
    pub drive: i8,
    /// Positive turns toward the left track
    pub turn: i8,
    /// Bit 0 brake, bit 1 unpair
    pub special: u8,
}

/// Special-byte bit forcing lift off
pub const SPECIAL_BRAKE: u8 = 0x01;

/// Special-byte bit requesting unpair
pub const SPECIAL_UNPAIR: u8 = 0x02;

impl ControlCommand {
    /// Emergency brake requested
    pub fn brake(&self) -> bool {
        self.special & SPECIAL_BRAKE != 0
    }

    /// Unpair requested
    pub fn unpair(&self) -> bool {
        self.special & SPECIAL_UNPAIR != 0
    }
}

/// Checksum mismatch on a control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptFault {
    /// Sum of the four decrypted body bytes
    pub computed: u8,
    /// Decrypted checksum byte
    pub received: u8,
}

/// Shared key plus cursor
#[derive(Clone, PartialEq, Eq)]
pub struct Keystream {
    key: [u8; KEY_LEN],
    cursor: usize,
}

// Keep key material out of logs
impl std::fmt::Debug for Keystream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystream")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Keystream {
    /// Start a keystream at cursor 0
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key, cursor: 0 }
    }

    /// Build from a key slice, `None` if shorter than [`KEY_LEN`]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let key: [u8; KEY_LEN] = bytes.get(..KEY_LEN)?.try_into().ok()?;
        Some(Self::new(key))
    }

    /// Current cursor, always `< KEY_LEN`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Last key byte
    pub fn last_key_byte(&self) -> u8 {
        self.key[KEY_LEN - 1]
    }

    /// Key byte under the cursor
    pub fn peek(&self) -> u8 {
        self.key[self.cursor]
    }

    /// Key byte under the cursor, then advance
    pub fn next_byte(&mut self) -> u8 {
        let byte = self.peek();
        self.cursor = (self.cursor + 1) % KEY_LEN;
        byte
    }

    /// Whether an encrypted tag decrypts to the control tag at the cursor
    pub fn is_control_tag(&self, encrypted_tag: u8) -> bool {
        encrypted_tag ^ self.peek() == CONTROL_TAG
    }

    /// Decrypt and verify a sealed control frame
    ///
    /// Always advances the cursor by [`SEALED_CONTROL_LEN`], whether or not the
    /// checksum matches.
    pub fn open(&mut self, sealed: &[u8; SEALED_CONTROL_LEN]) -> Result<ControlCommand, DecryptFault> {
        let mut body = [0u8; CONTROL_BODY_LEN];
        for (plain, &cipher) in body.iter_mut().zip(&sealed[..CONTROL_BODY_LEN]) {
            *plain = cipher ^ self.next_byte();
        }

        let computed = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let received = sealed[CONTROL_BODY_LEN] ^ self.next_byte();

        if computed != received {
            return Err(DecryptFault { computed, received });
        }

        Ok(ControlCommand {
            drive: body[1] as i8,
            turn: body[2] as i8,
            special: body[3],
        })
    }

    /// Encrypt a control frame at the cursor (controller side)
    pub fn seal(&mut self, command: &ControlCommand) -> [u8; SEALED_CONTROL_LEN] {
        let body = [CONTROL_TAG, command.drive as u8, command.turn as u8, command.special];
        let checksum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

        let mut sealed = [0u8; SEALED_CONTROL_LEN];
        for (out, plain) in sealed.iter_mut().zip(body.iter().chain(std::iter::once(&checksum))) {
            *out = plain ^ self.next_byte();
        }
        sealed
    }
}
