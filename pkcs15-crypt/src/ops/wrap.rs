//! Key wrap and unwrap
//!
//! The key being wrapped or unwrapped is named to the card through a target
//! file parameter; its own usage is not consulted.

use log::debug;

use super::{attach_iv, negotiate, require_usage};
use crate::card::{AlgorithmFlags, CardCommand};
use crate::error::{CardError, Result};
use crate::object::{KeyAlgorithm, KeyObject, KeyUsage, ObjectClass};
use crate::sec::executor::resolve_target_file;
use crate::sec::{SecEnvParam, SecOperation};
use crate::token::Token;

fn is_rsa_private(key: &KeyObject) -> bool {
    key.class == ObjectClass::PrivateKey && matches!(key.algorithm, KeyAlgorithm::Rsa { .. })
}

impl Token {
    /// Unwrap the cryptogram `input` with `key` into the on-card object
    /// `target`. The target file must already exist. `param` carries the IV
    /// for chained AES modes.
    pub fn unwrap_key(
        &self,
        key: &KeyObject,
        target: &KeyObject,
        flags: AlgorithmFlags,
        input: &[u8],
        param: &[u8],
    ) -> Result<usize> {
        if !is_rsa_private(key) && !key.is_secret() {
            return Err(CardError::NotSupported);
        }
        require_usage(key, KeyUsage::UNWRAP)?;

        let (mut env, info) = self.build_security_env(key, SecOperation::Unwrap)?;
        let target_file = resolve_target_file(&target.path, self.app_df.as_ref())?;
        debug!("Unwrapping into {}", target_file);
        env.params.push(SecEnvParam::TargetFile(target_file))?;

        negotiate(&mut env, info, flags)?;
        attach_iv(&mut env, param)?;

        self.use_key(key, &mut env, CardCommand::Unwrap, input, &mut [])
    }

    /// Wrap the on-card key `target` with `key` into `out`.
    ///
    /// Without an output buffer the cryptogram length is returned. A buffer
    /// shorter than the cryptogram fails with [`CardError::BufferTooSmall`].
    pub fn wrap_key(
        &self,
        key: &KeyObject,
        target: &KeyObject,
        flags: AlgorithmFlags,
        out: Option<&mut [u8]>,
        param: &[u8],
    ) -> Result<usize> {
        if !is_rsa_private(key) && !key.is_secret() {
            return Err(CardError::NotSupported);
        }
        require_usage(key, KeyUsage::WRAP)?;
        if !is_rsa_private(target) && !target.is_secret() {
            return Err(CardError::NotSupported);
        }

        let (mut env, info) = self.build_security_env(key, SecOperation::Wrap)?;
        let target_file = resolve_target_file(&target.path, self.app_df.as_ref())?;
        debug!("Wrapping {}", target_file);
        env.params.push(SecEnvParam::TargetFile(target_file))?;

        negotiate(&mut env, info, flags)?;
        attach_iv(&mut env, param)?;

        let has_buffer = out.is_some();
        let buf = out.unwrap_or_default();
        let capacity = buf.len();
        let r = self.use_key(key, &mut env, CardCommand::Wrap, &[], buf)?;
        if r > capacity && has_buffer {
            return Err(CardError::BufferTooSmall);
        }
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::mock::{mock_token, MockDevice};
    use crate::card::{Algorithm, AlgorithmInfo};
    use crate::object::{Path, SecretKeyType};
    use crate::sec::SecEnvFlags;

    const APP: &[u8] = &[0x3F, 0x00, 0x50, 0x15];

    fn card() -> MockDevice {
        MockDevice::new(vec![
            AlgorithmInfo::new(Algorithm::Rsa, 2048, AlgorithmFlags::RSA_RAW | AlgorithmFlags::RSA_PAD_PKCS1),
            AlgorithmInfo::new(Algorithm::Aes, 256, AlgorithmFlags::AES_FLAGS),
            AlgorithmInfo::new(Algorithm::Ec, 256, AlgorithmFlags::ECDSA_RAW),
        ])
    }

    fn aes_key(usage: KeyUsage) -> KeyObject {
        KeyObject::secret(&[0x10], SecretKeyType::Aes, 256)
            .with_usage(usage)
            .with_path(Path::new(&[0x3F, 0x00, 0x50, 0x15, 0x46, 0x01]))
    }

    fn target(path: Path) -> KeyObject {
        KeyObject::secret(&[0x20], SecretKeyType::Aes, 128).with_path(path)
    }

    #[test]
    fn test_unwrap_with_iv_and_target() {
        let (token, log) = mock_token(card());
        let token = token.with_app_df(Path::new(APP));
        let iv = [0x0F; 16];

        let r = token
            .unwrap_key(
                &aes_key(KeyUsage::UNWRAP),
                &target(Path::new(&[0x46, 0x02])),
                AlgorithmFlags::AES_CBC_PAD,
                &[0xC1; 48],
                &iv,
            )
            .unwrap();
        assert_eq!(r, 0);

        let envs = log.envs();
        let env = &envs[0];
        assert_eq!(env.operation, SecOperation::Unwrap);
        assert_eq!(env.target_file(), Some(&Path::new(&[0x3F, 0x00, 0x50, 0x15, 0x46, 0x02])));
        assert_eq!(env.iv(), Some(&iv[..]));
        assert!(env.flags().contains(SecEnvFlags::TARGET_FILE_REF_PRESENT));
        assert_eq!(log.commands()[0], (CardCommand::Unwrap, vec![0xC1; 48]));
    }

    #[test]
    fn test_unwrap_without_iv_for_rsa() {
        let (token, log) = mock_token(card());
        let rsa = KeyObject::private(&[1], KeyAlgorithm::Rsa { modulus_bits: 2048 })
            .with_usage(KeyUsage::UNWRAP)
            .with_path(Path::new(&[0x3F, 0x00, 0x45, 0x01]));

        token
            .unwrap_key(
                &rsa,
                &target(Path::new(&[0x3F, 0x00, 0x46, 0x09])),
                AlgorithmFlags::RSA_PAD_PKCS1_TYPE_02,
                &[0xC2; 256],
                &[0xFF; 16],
            )
            .unwrap();

        let envs = log.envs();
        assert_eq!(envs[0].iv(), None);
        assert_eq!(envs[0].target_file(), Some(&Path::new(&[0x46, 0x09])));
        assert_eq!(envs[0].algorithm_flags, AlgorithmFlags::RSA_PAD_PKCS1_TYPE_02);
    }

    #[test]
    fn test_unwrap_rejections() {
        let (token, log) = mock_token(card());
        let ec = KeyObject::private(&[1], KeyAlgorithm::Ec { field_bits: 256 }).with_usage(KeyUsage::UNWRAP);
        let tgt = target(Path::new(&[0x3F, 0x00, 0x46, 0x09]));
        assert_eq!(
            token.unwrap_key(&ec, &tgt, AlgorithmFlags::ECDSA_RAW, &[1; 8], &[]),
            Err(CardError::NotSupported)
        );
        assert_eq!(
            token.unwrap_key(&aes_key(KeyUsage::DECRYPT), &tgt, AlgorithmFlags::AES_ECB, &[1; 8], &[]),
            Err(CardError::NotAllowed)
        );
        // relative target without an application directory
        assert_eq!(
            token.unwrap_key(
                &aes_key(KeyUsage::UNWRAP),
                &target(Path::new(&[0x46, 0x02])),
                AlgorithmFlags::AES_ECB,
                &[1; 8],
                &[]
            ),
            Err(CardError::InvalidArguments)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_wrap_into_buffer() {
        let device = card().respond(Ok(vec![0xE7; 40]));
        let (token, log) = mock_token(device);
        let aid_target = target(Path::from_aid(&[0xE8, 0x28, 0xBD, 0x08, 0x0F]));

        let mut out = [0u8; 64];
        let r = token
            .wrap_key(
                &aes_key(KeyUsage::WRAP),
                &aid_target,
                AlgorithmFlags::AES_ECB,
                Some(&mut out[..]),
                &[],
            )
            .unwrap();
        assert_eq!(r, 40);
        assert_eq!(&out[..40], &[0xE7; 40]);

        let envs = log.envs();
        assert_eq!(envs[0].target_file(), Some(&aid_target.path));
        assert_eq!(envs[0].iv(), None);
        assert_eq!(log.commands()[0], (CardCommand::Wrap, Vec::new()));
    }

    #[test]
    fn test_wrap_length_query_and_short_buffer() {
        let device = card().respond(Ok(vec![0xE7; 40])).respond(Ok(vec![0xE7; 40]));
        let (token, _) = mock_token(device);
        let tgt = target(Path::new(&[0x3F, 0x00, 0x46, 0x09]));

        let r = token
            .wrap_key(&aes_key(KeyUsage::WRAP), &tgt, AlgorithmFlags::AES_CBC, None, &[0; 16])
            .unwrap();
        assert_eq!(r, 40);

        let mut short = [0u8; 16];
        assert_eq!(
            token.wrap_key(
                &aes_key(KeyUsage::WRAP),
                &tgt,
                AlgorithmFlags::AES_CBC,
                Some(&mut short[..]),
                &[0; 16]
            ),
            Err(CardError::BufferTooSmall)
        );
    }

    #[test]
    fn test_wrap_rejections() {
        let (token, log) = mock_token(card());
        let tgt = target(Path::new(&[0x3F, 0x00, 0x46, 0x09]));

        assert_eq!(
            token.wrap_key(&aes_key(KeyUsage::UNWRAP), &tgt, AlgorithmFlags::AES_ECB, None, &[]),
            Err(CardError::NotAllowed)
        );

        let ec_target = KeyObject::private(&[2], KeyAlgorithm::Ec { field_bits: 256 })
            .with_path(Path::new(&[0x3F, 0x00, 0x46, 0x0A]));
        assert_eq!(
            token.wrap_key(&aes_key(KeyUsage::WRAP), &ec_target, AlgorithmFlags::AES_ECB, None, &[]),
            Err(CardError::NotSupported)
        );

        let ec = KeyObject::private(&[3], KeyAlgorithm::Ec { field_bits: 256 }).with_usage(KeyUsage::WRAP);
        assert_eq!(
            token.wrap_key(&ec, &tgt, AlgorithmFlags::ECDSA_RAW, None, &[]),
            Err(CardError::NotSupported)
        );
        assert!(log.is_empty());
    }
}
