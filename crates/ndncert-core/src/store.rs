//! Request and certificate storage seam.
//!
//! The engines only ever see the [`RequestStore`] trait; the in-memory map
//! and the JSON-file store behind it are interchangeable. Access is
//! serialized by the engine owning the store, so implementations stay
//! single-threaded.

use crate::cert::Certificate;
use crate::request::{RequestId, RequestState};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persistence for in-flight sessions and issued certificates.
pub trait RequestStore: Send {
    /// Insert a new session.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DuplicateRequestId`] when a session with the
    /// same id is live.
    fn add_request(&mut self, request: RequestState) -> Result<()>;

    /// Fetch a session by id.
    fn get_request(&self, request_id: &RequestId) -> Result<RequestState>;

    /// Overwrite the session with the same id.
    fn update_request(&mut self, request: RequestState) -> Result<()>;

    /// Drop a session. Deleting an absent id is a no-op.
    fn delete_request(&mut self, request_id: &RequestId) -> Result<()>;

    /// Every live session (the sweeper walks this).
    fn list_requests(&self) -> Result<Vec<RequestState>>;

    /// Insert or replace an issued certificate under `key`.
    fn add_certificate(&mut self, key: &str, cert: Certificate) -> Result<()>;

    /// Fetch an issued certificate.
    fn get_certificate(&self, key: &str) -> Result<Certificate>;

    /// Drop an issued certificate. Absent keys are a no-op.
    fn delete_certificate(&mut self, key: &str) -> Result<()>;
}

/// Volatile store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    requests: HashMap<RequestId, RequestState>,
    certificates: HashMap<String, Certificate>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryStore {
    fn add_request(&mut self, request: RequestState) -> Result<()> {
        if self.requests.contains_key(&request.request_id) {
            return Err(Error::DuplicateRequestId);
        }
        self.requests.insert(request.request_id, request);
        Ok(())
    }

    fn get_request(&self, request_id: &RequestId) -> Result<RequestState> {
        self.requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("request {}", hex::encode(request_id))))
    }

    fn update_request(&mut self, request: RequestState) -> Result<()> {
        if !self.requests.contains_key(&request.request_id) {
            return Err(Error::NotFound(format!(
                "request {}",
                hex::encode(request.request_id)
            )));
        }
        self.requests.insert(request.request_id, request);
        Ok(())
    }

    fn delete_request(&mut self, request_id: &RequestId) -> Result<()> {
        self.requests.remove(request_id);
        Ok(())
    }

    fn list_requests(&self) -> Result<Vec<RequestState>> {
        Ok(self.requests.values().cloned().collect())
    }

    fn add_certificate(&mut self, key: &str, cert: Certificate) -> Result<()> {
        self.certificates.insert(key.to_string(), cert);
        Ok(())
    }

    fn get_certificate(&self, key: &str) -> Result<Certificate> {
        self.certificates
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("certificate {key}")))
    }

    fn delete_certificate(&mut self, key: &str) -> Result<()> {
        self.certificates.remove(key);
        Ok(())
    }
}

/// Durable store: one JSON file per table, rewritten on each mutation.
///
/// State survives process restarts; the file layout is
/// `<dir>/requests.json` and `<dir>/certs.json`.
pub struct JsonFileStore {
    inner: MemoryStore,
    requests_path: PathBuf,
    certs_path: PathBuf,
}

impl JsonFileStore {
    /// Open (or create) a store under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let requests_path = dir.join("requests.json");
        let certs_path = dir.join("certs.json");

        let mut inner = MemoryStore::new();
        if requests_path.exists() {
            let text = std::fs::read_to_string(&requests_path)?;
            let requests: Vec<RequestState> = serde_json::from_str(&text)?;
            for request in requests {
                inner.requests.insert(request.request_id, request);
            }
        }
        if certs_path.exists() {
            let text = std::fs::read_to_string(&certs_path)?;
            inner.certificates = serde_json::from_str(&text)?;
        }

        Ok(JsonFileStore {
            inner,
            requests_path,
            certs_path,
        })
    }

    fn persist_requests(&self) -> Result<()> {
        let requests: Vec<&RequestState> = self.inner.requests.values().collect();
        std::fs::write(&self.requests_path, serde_json::to_vec_pretty(&requests)?)?;
        Ok(())
    }

    fn persist_certificates(&self) -> Result<()> {
        std::fs::write(
            &self.certs_path,
            serde_json::to_vec_pretty(&self.inner.certificates)?,
        )?;
        Ok(())
    }
}

impl RequestStore for JsonFileStore {
    fn add_request(&mut self, request: RequestState) -> Result<()> {
        self.inner.add_request(request)?;
        self.persist_requests()
    }

    fn get_request(&self, request_id: &RequestId) -> Result<RequestState> {
        self.inner.get_request(request_id)
    }

    fn update_request(&mut self, request: RequestState) -> Result<()> {
        self.inner.update_request(request)?;
        self.persist_requests()
    }

    fn delete_request(&mut self, request_id: &RequestId) -> Result<()> {
        self.inner.delete_request(request_id)?;
        self.persist_requests()
    }

    fn list_requests(&self) -> Result<Vec<RequestState>> {
        self.inner.list_requests()
    }

    fn add_certificate(&mut self, key: &str, cert: Certificate) -> Result<()> {
        self.inner.add_certificate(key, cert)?;
        self.persist_certificates()
    }

    fn get_certificate(&self, key: &str) -> Result<Certificate> {
        self.inner.get_certificate(key)
    }

    fn delete_certificate(&mut self, key: &str) -> Result<()> {
        self.inner.delete_certificate(key)?;
        self.persist_certificates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::ValidityPeriod;
    use crate::request::{now_unix, RequestType};

    fn sample_cert(identity: &str) -> Certificate {
        Certificate {
            name: format!("{identity}/KEY/%01/self/v=1").parse().unwrap(),
            public_key: vec![0x04; 65],
            validity: ValidityPeriod {
                not_before: 0,
                not_after: 10,
            },
            key_locator: format!("{identity}/KEY/%01").parse().unwrap(),
            signature: vec![1],
        }
    }

    fn sample_request(id: u8) -> RequestState {
        RequestState::new(
            "/ndn".parse().unwrap(),
            [id; 8],
            RequestType::New,
            sample_cert("/ndn/site2"),
            [id; 16],
            now_unix() + 300,
        )
    }

    fn exercise(store: &mut dyn RequestStore) {
        // Sessions.
        store.add_request(sample_request(1)).unwrap();
        assert!(matches!(
            store.add_request(sample_request(1)),
            Err(Error::DuplicateRequestId)
        ));

        let fetched = store.get_request(&[1u8; 8]).unwrap();
        assert_eq!(fetched.encryption_key, [1u8; 16]);

        let mut updated = fetched;
        updated.challenge_status = "need-code".to_string();
        store.update_request(updated).unwrap();
        assert_eq!(
            store.get_request(&[1u8; 8]).unwrap().challenge_status,
            "need-code"
        );

        assert!(store.update_request(sample_request(9)).is_err());
        assert_eq!(store.list_requests().unwrap().len(), 1);

        store.delete_request(&[1u8; 8]).unwrap();
        assert!(store.get_request(&[1u8; 8]).is_err());

        // Certificates.
        let cert = sample_cert("/ndn/site2");
        store.add_certificate("111", cert.clone()).unwrap();
        assert_eq!(
            store.get_certificate("111").unwrap().identity(),
            "/ndn/site2".parse().unwrap()
        );
        store.delete_certificate("111").unwrap();
        assert!(store.get_certificate("111").is_err());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        exercise(&mut store);
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.add_request(sample_request(7)).unwrap();
            store
                .add_certificate("/ndn/site2", sample_cert("/ndn/site2"))
                .unwrap();
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get_request(&[7u8; 8]).unwrap().encryption_key, [7u8; 16]);
        assert!(store.get_certificate("/ndn/site2").is_ok());
    }
}
