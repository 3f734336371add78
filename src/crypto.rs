use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("can init with secret key");
    mac.update(val);

    mac.finalize().into_bytes().to_vec()
}

pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(val);

    mac.verify_slice(digest).is_ok()
}
