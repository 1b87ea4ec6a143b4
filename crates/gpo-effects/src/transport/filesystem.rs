//! Policy objects read from a local or mounted share
//!
//! `file://<path>` locations are read directly. `smb://<host>/<share>/<path>`
//! locations are read from `<sysvol_mount>/<share>/<path>`, where the share is
//! expected to be mounted with the caller's ticket. File names inside an
//! object are matched case-insensitively, as on the share itself.

use async_trait::async_trait;
use gpo_core::{ObjectClass, RawPolicyObject, TransportEffects, TransportError};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const MANIFEST_FILE: &str = "GPT.INI";
const REGISTRY_FILE: &str = "Registry.pol";

/// Transport reading policy objects from the filesystem
#[derive(Debug, Clone, Default)]
pub struct FilesystemTransport {
    sysvol_mount: Option<PathBuf>,
}

impl FilesystemTransport {
    /// Create a transport; `smb://` locations need `sysvol_mount`
    pub fn new(sysvol_mount: Option<PathBuf>) -> Self {
        Self { sysvol_mount }
    }

    /// Local directory holding the object at `location`
    pub fn resolve(&self, location: &str) -> Result<PathBuf, TransportError> {
        if let Some(path) = location.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }

        if let Some(rest) = location.strip_prefix("smb://") {
            let mount = self.sysvol_mount.as_ref().ok_or_else(|| {
                TransportError::Unreachable(format!("no share mount configured for {location}"))
            })?;
            let mut parts = rest.split('/').filter(|p| !p.is_empty()).skip(1);
            let share = parts
                .next()
                .ok_or_else(|| TransportError::Unreachable(format!("no share in {location}")))?;
            let mut path = mount.join(share);
            for part in parts {
                if part == ".." {
                    return Err(TransportError::Unreachable(format!(
                        "parent traversal in {location}"
                    )));
                }
                path.push(part);
            }
            return Ok(path);
        }

        Err(TransportError::Unreachable(format!(
            "unsupported location {location}"
        )))
    }
}

#[async_trait]
impl TransportEffects for FilesystemTransport {
    async fn download(&self, location: &str, _ticket: &Path) -> Result<RawPolicyObject, TransportError> {
        let root = self.resolve(location)?;
        debug!(location, path = %root.display(), "reading policy object");

        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(unreachable_at(&root, "not a directory")),
            Err(e) => return Err(unreachable_at(&root, e)),
        }

        let manifest_path = find_child(&root, MANIFEST_FILE)
            .await?
            .ok_or_else(|| TransportError::MissingResource(MANIFEST_FILE.to_string()))?;
        let manifest = decode_text(&read(&manifest_path).await?);

        Ok(RawPolicyObject {
            manifest,
            user: read_registry(&root, ObjectClass::User).await?,
            machine: read_registry(&root, ObjectClass::Computer).await?,
        })
    }
}

async fn read_registry(root: &Path, class: ObjectClass) -> Result<Option<Vec<u8>>, TransportError> {
    let Some(class_dir) = find_child(root, class.policy_dir()).await? else {
        return Ok(None);
    };
    let Some(file) = find_child(&class_dir, REGISTRY_FILE).await? else {
        return Ok(None);
    };
    read(&file).await.map(Some)
}

async fn find_child(dir: &Path, name: &str) -> Result<Option<PathBuf>, TransportError> {
    let exact = dir.join(name);
    if fs::try_exists(&exact).await.unwrap_or(false) {
        return Ok(Some(exact));
    }

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unreachable_at(dir, e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(|e| unreachable_at(dir, e))? {
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

async fn read(path: &Path) -> Result<Vec<u8>, TransportError> {
    fs::read(path).await.map_err(|e| unreachable_at(path, e))
}

// GPT.INI is usually UTF-8 but may be written as UTF-16LE with a BOM.
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xff, 0xfe, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn unreachable_at(path: &Path, reason: impl std::fmt::Display) -> TransportError {
    TransportError::Unreachable(format!("{}: {reason}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn object(root: &Path, id: &str) -> PathBuf {
        let dir = root.join("SYSVOL/example.com/Policies").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("GPT.INI"), "[General]\nVersion=2\n").unwrap();
        dir
    }

    #[test]
    fn test_resolve_locations() {
        let transport = FilesystemTransport::new(Some(PathBuf::from("/mnt/sysvol")));
        assert_eq!(
            transport.resolve("smb://adc.example.com/SYSVOL/example.com/Policies/{ID}").unwrap(),
            PathBuf::from("/mnt/sysvol/SYSVOL/example.com/Policies/{ID}")
        );
        assert_eq!(
            transport.resolve("file:///srv/Policies/standard").unwrap(),
            PathBuf::from("/srv/Policies/standard")
        );
        assert_matches!(transport.resolve("ldap://adc/x"), Err(TransportError::Unreachable(_)));
        assert_matches!(
            transport.resolve("smb://adc/SYSVOL/../../etc"),
            Err(TransportError::Unreachable(_))
        );
        assert_matches!(
            FilesystemTransport::default().resolve("smb://adc/SYSVOL/x"),
            Err(TransportError::Unreachable(_))
        );
    }

    #[tokio::test]
    async fn test_download_reads_class_documents() {
        let root = TempDir::new().unwrap();
        let dir = object(root.path(), "standard");
        std::fs::create_dir_all(dir.join("USER")).unwrap();
        std::fs::write(dir.join("USER/registry.pol"), b"user-pol").unwrap();

        let transport = FilesystemTransport::new(Some(root.path().to_path_buf()));
        let raw = transport
            .download("smb://localhost/SYSVOL/example.com/Policies/standard", Path::new("t"))
            .await
            .unwrap();

        assert_eq!(raw.manifest, "[General]\nVersion=2\n");
        assert_eq!(raw.user.as_deref(), Some(&b"user-pol"[..]));
        assert_eq!(raw.machine, None);
    }

    #[tokio::test]
    async fn test_download_decodes_utf16_manifest() {
        let root = TempDir::new().unwrap();
        let dir = object(root.path(), "utf16");
        let mut bytes = vec![0xff, 0xfe];
        bytes.extend("[General]\r\nVersion=7\r\n".encode_utf16().flat_map(u16::to_le_bytes));
        std::fs::write(dir.join("GPT.INI"), bytes).unwrap();

        let raw = FilesystemTransport::default()
            .download(&format!("file://{}", dir.display()), Path::new("t"))
            .await
            .unwrap();
        assert_eq!(raw.manifest, "[General]\r\nVersion=7\r\n");
    }

    #[tokio::test]
    async fn test_missing_manifest_and_missing_object() {
        let root = TempDir::new().unwrap();
        let dir = object(root.path(), "no-gpt-ini");
        std::fs::remove_file(dir.join("GPT.INI")).unwrap();

        let transport = FilesystemTransport::default();
        assert_matches!(
            transport.download(&format!("file://{}", dir.display()), Path::new("t")).await,
            Err(TransportError::MissingResource(_))
        );
        assert_matches!(
            transport
                .download(&format!("file://{}/absent", root.path().display()), Path::new("t"))
                .await,
            Err(TransportError::Unreachable(_))
        );
    }
}
