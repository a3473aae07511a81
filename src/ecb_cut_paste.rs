//! ECB cut-and-paste: forging an admin profile out of ciphertext blocks the oracle produced for
//! ordinary users.

use crate::{
    cipher::Aes128,
    error::{Error, Result},
    modes::{decrypt_ecb, encrypt_ecb},
    oracle::EncryptionOracle,
    padding::{pkcs7_padded, unpad_pkcs7},
};
use tracing::{debug, instrument};

const EMAIL_KEY: &str = "email=";
const ROLE_KEY: &str = "&role=";

/// A user record, serialised as `email=<email>&role=<role>&uid=<uid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub email: String,
    pub role: String,
    pub uid: Option<u32>,
}

impl Profile {
    /// An ordinary user. Metacharacters are stripped from the email so it cannot smuggle in
    /// fields of its own.
    #[must_use]
    pub fn for_email(email: &str) -> Self {
        Profile {
            email: email.replace(['&', '='], ""),
            role: "user".to_string(),
            uid: Some(10),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let mut encoded = format!("{EMAIL_KEY}{}{ROLE_KEY}{}", self.email, self.role);
        if let Some(uid) = self.uid {
            encoded.push_str(&format!("&uid={uid}"));
        }
        encoded
    }

    /// Parse an encoded profile. When a key repeats, its first value wins.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedProfile`] if `email` or `role` is missing, or `uid` is not a number.
    pub fn decode(encoded: &str) -> Result<Self> {
        let mut email = None;
        let mut role = None;
        let mut uid = None;

        for (key, value) in form_urlencoded::parse(encoded.as_bytes()) {
            let slot = match key.as_ref() {
                "email" => &mut email,
                "role" => &mut role,
                "uid" => &mut uid,
                _ => continue,
            };
            slot.get_or_insert_with(|| value.into_owned());
        }

        let uid = uid
            .map(|uid| {
                uid.parse()
                    .map_err(|_| Error::MalformedProfile(format!("uid {uid:?} is not a number")))
            })
            .transpose()?;

        Ok(Profile {
            email: email.ok_or_else(|| Error::MalformedProfile("missing email".to_string()))?,
            role: role.ok_or_else(|| Error::MalformedProfile("missing role".to_string()))?,
            uid,
        })
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Encrypts the profile for an email under AES-128-ECB with a key only it knows.
#[derive(Debug)]
pub struct ProfileOracle {
    cipher: Aes128,
}

impl ProfileOracle {
    #[must_use]
    pub fn new_random() -> Self {
        ProfileOracle {
            cipher: Aes128::random(),
        }
    }

    /// Decrypt a profile ciphertext the way the service would when a user presents it.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedProfile`] if the padding or the decoded record is invalid, and cipher
    /// errors for misaligned input.
    pub fn decrypt_profile(&self, ciphertext: &[u8]) -> Result<Profile> {
        let padded = decrypt_ecb(&self.cipher, ciphertext)?;
        let plaintext = unpad_pkcs7(&padded, Aes128::BLOCK_SIZE)
            .ok_or_else(|| Error::MalformedProfile("invalid padding".to_string()))?;
        let encoded = std::str::from_utf8(plaintext)
            .map_err(|e| Error::MalformedProfile(e.to_string()))?;

        Profile::decode(encoded)
    }
}

impl EncryptionOracle for ProfileOracle {
    /// `plaintext` is the email address.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let email = String::from_utf8_lossy(plaintext);
        let encoded = Profile::for_email(&email).encode();
        encrypt_ecb(&self.cipher, &pkcs7_padded(encoded.as_bytes(), Aes128::BLOCK_SIZE))
    }
}

/// Blocks `range` of the oracle's output for `email`.
fn blocks<O: EncryptionOracle + ?Sized>(
    oracle: &O,
    email: &[u8],
    range: std::ops::Range<usize>,
) -> Result<Vec<u8>> {
    oracle
        .encrypt(email)?
        .get(range)
        .map(<[u8]>::to_vec)
        .ok_or(Error::InputNotLocated)
}

/// Build a ciphertext that decrypts to a profile with role `admin`, from two ordinary queries.
///
/// The first email is sized so that `role=` ends on a block boundary, and its blocks up to
/// there are kept. The second email is sized so that it ends on a block boundary after
/// `email=` and then carries `admin` with its own PKCS#7 padding, which becomes the final
/// block(s) of the forgery.
///
/// # Errors
///
/// [`Error::InputNotLocated`] if the oracle output is shorter than the profile layout implies,
/// and oracle errors.
#[instrument(skip(oracle))]
pub fn forge_admin_profile<O: EncryptionOracle + ?Sized>(
    oracle: &O,
    block_size: usize,
) -> Result<Vec<u8>> {
    let head_len = EMAIL_KEY.len() + ROLE_KEY.len();
    let email_len = (block_size - head_len % block_size) % block_size;
    let head_end = head_len + email_len;
    let head = blocks(oracle, &vec![b'A'; email_len], 0..head_end)?;

    let fill_len = (block_size - EMAIL_KEY.len() % block_size) % block_size;
    let admin = pkcs7_padded(b"admin", block_size);
    let admin_start = EMAIL_KEY.len() + fill_len;
    let email = [vec![b'A'; fill_len], admin.clone()].concat();
    let tail = blocks(oracle, &email, admin_start..admin_start + admin.len())?;

    debug!(email_len, fill_len, "spliced role block");
    Ok([head, tail].concat())
}
