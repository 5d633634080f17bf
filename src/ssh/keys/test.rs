use super::*;
use crate::ssh::fixtures::FakeKeygen;
use tempfile::TempDir;

fn file_mode(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

fn pair(dir: &TempDir) -> KeyPair {
    KeyPair::new(dir.path().join("id_ed25519"), "test@example.com")
}

mod key_pair {
    use super::*;

    #[test]
    fn public_key_sits_next_to_private() {
        let pair = KeyPair::new("/home/archie/.ssh/id_ed25519", "c");
        assert_eq!(Path::new("/home/archie/.ssh/id_ed25519.pub"), pair.public);
    }

    #[test]
    fn key_body_is_second_field() {
        assert_eq!(Some("AAAA"), key_body("ssh-ed25519 AAAA a@b\n"));
        assert_eq!(Some("AAAA"), key_body("ssh-ed25519 AAAA"));
        assert_eq!(None, key_body("ssh-ed25519"));
    }
}

mod ssh_dir {
    use super::*;

    #[test]
    fn creates_with_mode_0700() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".ssh");
        let step = SshDirStep::new(&dir);

        assert!(!step.check().unwrap());
        step.apply().unwrap();
        assert!(step.check().unwrap());
        assert_eq!(0o700, file_mode(&dir));
    }

    #[test]
    fn repairs_loose_mode() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".ssh");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, Permissions::from_mode(0o755)).unwrap();
        let step = SshDirStep::new(&dir);

        assert!(!step.check().unwrap());
        step.apply().unwrap();
        assert_eq!(0o700, file_mode(&dir));
    }
}

mod key_pair_step {
    use super::*;

    #[test]
    fn generates_when_absent() {
        let dir = TempDir::new().unwrap();
        let keygen = FakeKeygen::default();
        let step = KeyPairStep::new(pair(&dir), &keygen);

        assert!(!step.check().unwrap());
        step.apply().unwrap();
        assert!(step.check().unwrap());
        assert_eq!(1, keygen.generated.get());
        assert_eq!(0, keygen.derived.get());
    }

    #[test]
    fn derives_missing_public_key() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir);
        fs::write(&pair.private, "PRIVATE7\n").unwrap();
        let keygen = FakeKeygen::default();
        let step = KeyPairStep::new(pair.clone(), &keygen);

        assert!(!step.check().unwrap());
        step.apply().unwrap();
        assert_eq!(0, keygen.generated.get());
        assert_eq!(1, keygen.derived.get());
        assert_eq!("ssh-ed25519 KEY7\n", fs::read_to_string(&pair.public).unwrap());
        assert_eq!("PRIVATE7\n", fs::read_to_string(&pair.private).unwrap());
        assert_eq!(0o644, file_mode(&pair.public));
    }

    #[test]
    fn replaces_orphaned_public_key() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir);
        fs::write(&pair.public, "ssh-ed25519 STALE\n").unwrap();
        let keygen = FakeKeygen::default();
        let step = KeyPairStep::new(pair.clone(), &keygen);

        step.apply().unwrap();
        assert_eq!(1, keygen.generated.get());
        assert_eq!(
            "ssh-ed25519 KEY1 test@example.com\n",
            fs::read_to_string(&pair.public).unwrap(),
        );
    }

    #[test]
    fn reset_removes_both_halves() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir);
        let keygen = FakeKeygen::default();
        let step = KeyPairStep::new(pair.clone(), &keygen);
        step.apply().unwrap();

        assert!(step.forceable());
        step.reset().unwrap();
        assert!(!pair.private.exists());
        assert!(!pair.public.exists());
        // Nothing left to remove is fine.
        step.reset().unwrap();
    }
}

mod key_mode_step {
    use super::*;

    #[test]
    fn tightens_modes() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir);
        fs::write(&pair.private, "PRIVATE1\n").unwrap();
        fs::write(&pair.public, "ssh-ed25519 KEY1\n").unwrap();
        fs::set_permissions(&pair.private, Permissions::from_mode(0o664)).unwrap();
        fs::set_permissions(&pair.public, Permissions::from_mode(0o600)).unwrap();
        let step = KeyModeStep::new(pair.clone());

        assert!(!step.check().unwrap());
        step.apply().unwrap();
        assert!(step.check().unwrap());
        assert_eq!(0o600, file_mode(&pair.private));
        assert_eq!(0o644, file_mode(&pair.public));
    }
}

mod ssh_keygen {
    use super::*;

    #[test]
    fn generates_and_derives() {
        if client::which("ssh-keygen").is_none() {
            eprintln!("ssh-keygen not found; skipping");
            return;
        }
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir);

        SshKeygen.generate(&pair).unwrap();
        let public = pair.public_key().unwrap();
        assert!(public.starts_with("ssh-ed25519 "));
        assert!(public.ends_with(" test@example.com"));
        assert_eq!(0o600, file_mode(&pair.private));

        let derived = SshKeygen.derive_public(&pair.private).unwrap();
        assert_eq!(key_body(&public), key_body(&derived));
    }
}
