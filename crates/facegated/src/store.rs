use facegate_core::types::ENCODING_DIM;
use facegate_core::{Encoding, GalleryEntry};
use rusqlite::OptionalExtension;
use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

const ENCODING_BYTE_LEN: usize = ENCODING_DIM * 4;
const NONCE_LEN: usize = 12;
/// Per-installation gallery key, stored next to the database.
const KEY_FILE: &str = "gallery.key";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("unknown identity: {0}")]
    UnknownIdentity(String),
    #[error("encoding encryption failed")]
    EncryptionFailed,
    #[error("encoding decryption failed: key mismatch or corrupted data")]
    DecryptionFailed,
    #[error("invalid encoding blob size: {0} bytes")]
    InvalidBlob(usize),
    #[error("invalid encoding dimension: {0} (expected 100)")]
    InvalidEncodingDim(usize),
    #[error("invalid encoding value (NaN/Inf)")]
    InvalidEncodingValue,
    #[error("gallery key I/O error: {0}")]
    KeyIo(#[source] std::io::Error),
    #[error("gallery key file holds {0} bytes, expected 32")]
    BadKeyFile(usize),
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// SQLite-backed gallery of face encodings, keyed by identity.
///
/// Encodings are sealed with AES-256-GCM before they reach SQLite (see
/// [`EncodingSeal`]). Deleting a user cascades to its encodings and issued
/// tokens.
#[derive(Clone)]
pub struct GalleryStore {
    conn: Connection,
    seal: EncodingSeal,
}

impl GalleryStore {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let seal = EncodingSeal::for_gallery(db_path)?;
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 CREATE TABLE IF NOT EXISTS users (
                     id TEXT PRIMARY KEY,
                     name TEXT NOT NULL UNIQUE,
                     created_at TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS encodings (
                     id TEXT PRIMARY KEY,
                     user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                     encoding BLOB NOT NULL,
                     registered INTEGER NOT NULL DEFAULT 1,
                     quality_score REAL,
                     created_at TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_encodings_user ON encodings(user_id);
                 CREATE TABLE IF NOT EXISTS tokens (
                     jti TEXT PRIMARY KEY,
                     token_hash TEXT NOT NULL,
                     user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                     created_at TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);",
            )?;
            Ok(())
        })
        .await?;

        tracing::info!(path = %db_path.display(), "gallery store opened");
        Ok(Self { conn, seal })
    }

    pub async fn create_user(&self, name: &str) -> Result<User, StoreError> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let row = user.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, name, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![row.id, row.name, row.created_at],
                )?;
                Ok(())
            })
            .await?;
        tracing::info!(user = %user.name, id = %user.id, "user created");
        Ok(user)
    }

    pub async fn user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, name, created_at FROM users WHERE name = ?1",
                        [&name],
                        |row| {
                            Ok(User {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                created_at: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Append one encoding for an existing identity. Returns the row id.
    pub async fn append(
        &self,
        identity: &str,
        encoding: &Encoding,
        registered: bool,
        quality_score: Option<f32>,
    ) -> Result<String, StoreError> {
        let mut ids = self
            .append_all(
                identity,
                std::slice::from_ref(encoding),
                quality_score.as_slice(),
                registered,
            )
            .await?;
        ids.pop()
            .ok_or_else(|| StoreError::UnknownIdentity(identity.to_string()))
    }

    /// Append several encodings for an existing identity in one transaction.
    ///
    /// `quality_scores[i]` belongs to `encodings[i]`; encodings without a
    /// matching score are stored with a NULL quality.
    pub async fn append_all(
        &self,
        identity: &str,
        encodings: &[Encoding],
        quality_scores: &[f32],
        registered: bool,
    ) -> Result<Vec<String>, StoreError> {
        let rows = encodings
            .iter()
            .enumerate()
            .map(|(i, e)| Ok((self.seal.seal(e)?, quality_scores.get(i).copied())))
            .collect::<Result<Vec<(Vec<u8>, Option<f32>)>, StoreError>>()?;
        let created_at = chrono::Utc::now().to_rfc3339();
        let name = identity.to_string();

        let ids = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let user_id: Option<String> = tx
                    .query_row("SELECT id FROM users WHERE name = ?1", [&name], |row| row.get(0))
                    .optional()?;
                let Some(user_id) = user_id else {
                    return Ok(None);
                };
                let mut ids = Vec::with_capacity(rows.len());
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO encodings (id, user_id, encoding, registered, quality_score, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )?;
                    for (blob, quality_score) in &rows {
                        let id = uuid::Uuid::new_v4().to_string();
                        stmt.execute(rusqlite::params![
                            id,
                            user_id,
                            blob,
                            registered,
                            quality_score,
                            created_at
                        ])?;
                        ids.push(id);
                    }
                }
                tx.commit()?;
                Ok(Some(ids))
            })
            .await?;

        let ids = ids.ok_or_else(|| StoreError::UnknownIdentity(identity.to_string()))?;
        tracing::debug!(identity, count = ids.len(), registered, "encodings appended");
        Ok(ids)
    }

    /// Point-in-time snapshot of the gallery across every identity, in insertion order.
    pub async fn read_all(&self, registered_only: bool) -> Result<Vec<GalleryEntry>, StoreError> {
        let rows: Vec<(String, Vec<u8>)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.name, e.encoding
                     FROM encodings e JOIN users u ON u.id = e.user_id
                     WHERE ?1 = 0 OR e.registered = 1
                     ORDER BY e.rowid",
                )?;
                let rows = stmt.query_map([registered_only], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        rows.into_iter()
            .map(|(identity, blob)| {
                Ok(GalleryEntry {
                    identity,
                    encoding: self.seal.open(&blob)?,
                })
            })
            .collect()
    }

    pub async fn read_for_identity(&self, identity: &str) -> Result<Vec<Encoding>, StoreError> {
        let name = identity.to_string();
        let blobs: Vec<Vec<u8>> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.encoding
                     FROM encodings e JOIN users u ON u.id = e.user_id
                     WHERE u.name = ?1
                     ORDER BY e.rowid",
                )?;
                let rows = stmt.query_map([&name], |row| row.get::<_, Vec<u8>>(0))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        blobs
            .iter()
            .map(|blob| self.seal.open(blob))
            .collect()
    }

    /// Whether the identity has at least one stored encoding.
    pub async fn has_any(&self, identity: &str) -> Result<bool, StoreError> {
        let name = identity.to_string();
        self.conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(
                         SELECT 1 FROM encodings e JOIN users u ON u.id = e.user_id
                         WHERE u.name = ?1
                     )",
                    [&name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Remove every encoding of an identity, keeping the account. Returns rows removed.
    pub async fn delete_all(&self, identity: &str) -> Result<usize, StoreError> {
        let name = identity.to_string();
        self.conn
            .call(move |conn| {
                let affected = conn.execute(
                    "DELETE FROM encodings WHERE user_id IN (SELECT id FROM users WHERE name = ?1)",
                    [&name],
                )?;
                Ok(affected)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Remove the account together with its encodings and tokens.
    pub async fn delete_user(&self, identity: &str) -> Result<bool, StoreError> {
        let name = identity.to_string();
        self.conn
            .call(move |conn| {
                let affected = conn.execute("DELETE FROM users WHERE name = ?1", [&name])?;
                Ok(affected > 0)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn add_token(&self, jti: &str, token_hash: &str, user_id: &str) -> Result<(), StoreError> {
        let (jti, token_hash, user_id) = (jti.to_string(), token_hash.to_string(), user_id.to_string());
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tokens (jti, token_hash, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![jti, token_hash, user_id, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    /// Drop every token issued to a user. Returns tokens removed.
    pub async fn revoke_tokens(&self, user_id: &str) -> Result<usize, StoreError> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                let affected = conn.execute("DELETE FROM tokens WHERE user_id = ?1", [&user_id])?;
                Ok(affected)
            })
            .await
            .map_err(StoreError::from)
    }

    /// User id holding a live token with this hash.
    pub async fn token_owner(&self, token_hash: &str) -> Result<Option<String>, StoreError> {
        let token_hash = token_hash.to_string();
        self.conn
            .call(move |conn| {
                let owner = conn
                    .query_row(
                        "SELECT user_id FROM tokens WHERE token_hash = ?1",
                        [&token_hash],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(owner)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Mean capture quality over encodings that recorded one.
    pub async fn mean_quality(&self) -> Result<Option<f64>, StoreError> {
        self.conn
            .call(|conn| {
                let mean: Option<f64> =
                    conn.query_row("SELECT AVG(quality_score) FROM encodings", [], |row| row.get(0))?;
                Ok(mean)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Count stored encodings across all users.
    pub async fn count_all(&self) -> Result<u64, StoreError> {
        self.conn
            .call(|conn| {
                let count: u64 =
                    conn.query_row("SELECT COUNT(*) FROM encodings", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn count_users(&self) -> Result<u64, StoreError> {
        self.conn
            .call(|conn| {
                let count: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(StoreError::from)
    }
}

/// AES-256-GCM sealing for stored encodings.
///
/// Blob layout: 12-byte random nonce, then the ciphertext of the 100
/// little-endian f32 values followed by the 16-byte tag.
#[derive(Clone)]
struct EncodingSeal {
    cipher: Aes256Gcm,
}

impl EncodingSeal {
    /// In-memory galleries use a fixed all-zero key. File galleries read
    /// `KEY_FILE` from the database directory, creating it (mode 0600) on
    /// first use.
    fn for_gallery(db_path: &Path) -> Result<Self, StoreError> {
        if db_path == Path::new(":memory:") {
            return Ok(Self::with_key(&[0u8; 32]));
        }
        let dir = match db_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(StoreError::KeyIo)?;

        let key_path = dir.join(KEY_FILE);
        let key = match std::fs::read(&key_path) {
            Ok(bytes) => {
                <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| StoreError::BadKeyFile(bytes.len()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_key_file(&key_path)?,
            Err(e) => return Err(StoreError::KeyIo(e)),
        };
        tracing::debug!(path = %key_path.display(), "gallery key ready");
        Ok(Self::with_key(&key))
    }

    fn with_key(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    fn seal(&self, encoding: &Encoding) -> Result<Vec<u8>, StoreError> {
        check_values(encoding.as_slice())?;
        let plaintext: Vec<u8> = encoding
            .as_slice()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| StoreError::EncryptionFailed)?;
        Ok([nonce.as_slice(), sealed.as_slice()].concat())
    }

    fn open(&self, blob: &[u8]) -> Result<Encoding, StoreError> {
        if blob.len() <= NONCE_LEN {
            return Err(StoreError::InvalidBlob(blob.len()));
        }
        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| StoreError::DecryptionFailed)?;
        if plaintext.len() != ENCODING_BYTE_LEN {
            return Err(StoreError::InvalidBlob(plaintext.len()));
        }

        let values: Vec<f32> = plaintext
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        check_values(&values)?;
        Ok(Encoding::new(values))
    }
}

fn create_key_file(path: &Path) -> Result<[u8; 32], StoreError> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .and_then(|mut f| f.write_all(&key))
        .map_err(StoreError::KeyIo)?;
    tracing::info!(path = %path.display(), "created gallery key");
    Ok(key)
}

fn check_values(values: &[f32]) -> Result<(), StoreError> {
    if values.len() != ENCODING_DIM {
        return Err(StoreError::InvalidEncodingDim(values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::InvalidEncodingValue);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> GalleryStore {
        GalleryStore::open(Path::new(":memory:")).await.unwrap()
    }

    fn encoding(seed: f32) -> Encoding {
        Encoding::new((0..ENCODING_DIM).map(|i| seed + i as f32 / 1000.0).collect())
    }

    #[tokio::test]
    async fn test_append_and_read_roundtrip() {
        let store = store().await;
        store.create_user("alice").await.unwrap();

        let e = encoding(0.5);
        let id = store.append("alice", &e, true, Some(95.0)).await.unwrap();
        assert!(!id.is_empty());

        let stored = store.read_for_identity("alice").await.unwrap();
        assert_eq!(stored, vec![e.clone()]);

        let gallery = store.read_all(true).await.unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].identity, "alice");
        assert_eq!(gallery[0].encoding, e);
    }

    #[tokio::test]
    async fn test_append_unknown_identity() {
        let store = store().await;
        let err = store.append("ghost", &encoding(0.0), true, Some(90.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownIdentity(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_invalid_encodings_rejected() {
        let store = store().await;
        store.create_user("alice").await.unwrap();

        let short = Encoding::new(vec![0.0; 10]);
        let err = store.append("alice", &short, true, Some(90.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidEncodingDim(10)));

        let mut values = vec![0.1; ENCODING_DIM];
        values[7] = f32::NAN;
        let err = store.append("alice", &Encoding::new(values), true, Some(90.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidEncodingValue));

        assert!(!store.has_any("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_all_filters_unregistered() {
        let store = store().await;
        store.create_user("alice").await.unwrap();
        store.create_user("bob").await.unwrap();
        store.append_all("alice", &[encoding(0.1), encoding(0.2)], &[], true).await.unwrap();
        store.append("bob", &encoding(0.3), false, None).await.unwrap();

        assert_eq!(store.read_all(true).await.unwrap().len(), 2);
        let all = store.read_all(false).await.unwrap();
        let identities: Vec<&str> = all.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(identities, vec!["alice", "alice", "bob"]);
        assert_eq!(store.count_all().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_has_any_and_delete_all() {
        let store = store().await;
        store.create_user("alice").await.unwrap();
        assert!(!store.has_any("alice").await.unwrap());
        assert!(!store.has_any("nobody").await.unwrap());

        store.append_all("alice", &[encoding(0.1), encoding(0.2)], &[], true).await.unwrap();
        assert!(store.has_any("alice").await.unwrap());

        assert_eq!(store.delete_all("alice").await.unwrap(), 2);
        assert!(!store.has_any("alice").await.unwrap());
        assert!(store.user_by_name("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = store().await;
        let user = store.create_user("alice").await.unwrap();
        store.append("alice", &encoding(0.1), true, Some(90.0)).await.unwrap();
        store.add_token("jti-1", "hash", &user.id).await.unwrap();

        assert!(store.delete_user("alice").await.unwrap());
        assert!(store.user_by_name("alice").await.unwrap().is_none());
        assert_eq!(store.count_all().await.unwrap(), 0);
        assert_eq!(store.revoke_tokens(&user.id).await.unwrap(), 0);
        assert!(!store.delete_user("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = store().await;
        store.create_user("alice").await.unwrap();
        assert!(store.create_user("alice").await.is_err());
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tokens_revoked() {
        let store = store().await;
        let user = store.create_user("alice").await.unwrap();
        store.add_token("jti-1", "h1", &user.id).await.unwrap();
        store.add_token("jti-2", "h2", &user.id).await.unwrap();
        assert_eq!(store.revoke_tokens(&user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_token_owner() {
        let store = store().await;
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();
        store.add_token("jti-1", "h-alice", &alice.id).await.unwrap();
        store.add_token("jti-2", "h-bob", &bob.id).await.unwrap();

        assert_eq!(store.token_owner("h-alice").await.unwrap(), Some(alice.id.clone()));
        assert_eq!(store.token_owner("h-bob").await.unwrap(), Some(bob.id));
        assert_eq!(store.token_owner("h-none").await.unwrap(), None);

        store.revoke_tokens(&alice.id).await.unwrap();
        assert_eq!(store.token_owner("h-alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quality_scores_recorded() {
        let store = store().await;
        store.create_user("alice").await.unwrap();
        assert_eq!(store.mean_quality().await.unwrap(), None);

        store.append_all("alice", &[encoding(0.1), encoding(0.2)], &[], true).await.unwrap();
        assert_eq!(store.mean_quality().await.unwrap(), None);

        store
            .append_all("alice", &[encoding(0.3), encoding(0.4), encoding(0.5)], &[80.0, 100.0], true)
            .await
            .unwrap();
        // the third encoding has no score and is left out of the mean
        assert_eq!(store.mean_quality().await.unwrap(), Some(90.0));
        assert_eq!(store.count_all().await.unwrap(), 5);
    }

    #[test]
    fn test_sealed_blobs() {
        let seal = EncodingSeal::with_key(&[7u8; 32]);
        let mut values = vec![0.25f32; ENCODING_DIM];
        values[0] = -0.0;
        values[1] = f32::MIN_POSITIVE;
        values[2] = std::f32::consts::PI;
        let e = Encoding::new(values);

        let a = seal.seal(&e).unwrap();
        let b = seal.seal(&e).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), NONCE_LEN + ENCODING_BYTE_LEN + 16);

        let opened = seal.open(&a).unwrap();
        for (orig, rec) in e.as_slice().iter().zip(opened.as_slice()) {
            assert_eq!(orig.to_bits(), rec.to_bits());
        }

        let mut tampered = a.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        assert!(matches!(seal.open(&tampered), Err(StoreError::DecryptionFailed)));
        assert!(matches!(seal.open(&a[..8]), Err(StoreError::InvalidBlob(8))));

        let other = EncodingSeal::with_key(&[8u8; 32]);
        assert!(matches!(other.open(&a), Err(StoreError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_key_file_persists_across_reopen() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("facegate-store-{}", uuid::Uuid::new_v4()));
        let db = dir.join("gallery.db");
        {
            let store = GalleryStore::open(&db).await.unwrap();
            store.create_user("alice").await.unwrap();
            store.append("alice", &encoding(0.7), true, None).await.unwrap();
        }

        let mode = std::fs::metadata(dir.join(KEY_FILE)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let reopened = GalleryStore::open(&db).await.unwrap();
        assert_eq!(reopened.read_for_identity("alice").await.unwrap(), vec![encoding(0.7)]);

        std::fs::write(dir.join(KEY_FILE), [1u8; 5]).unwrap();
        assert!(matches!(GalleryStore::open(&db).await, Err(StoreError::BadKeyFile(5))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
