use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

// Keys keep their `/` separators in public URLs.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Published files are fetched through their public URL, so the CDN may hold them for an hour.
const PUBLISHED_CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {0} does not exist")]
    Missing(String),
    #[error("object {operation} failed for {key}: {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A file about to be published under `key`.
#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn put_object(&self, upload: ObjectUpload) -> StorageResult<()>;

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Deleting a key that is already gone succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Public address of `key` under the store's addressing scheme.
    fn public_url(&self, key: &str) -> String;
}

pub fn join_public_url(base: &str, key: &str) -> String {
    let encoded = utf8_percent_encode(key.trim_start_matches('/'), KEY_SEGMENT);
    format!("{}/{}", base.trim_end_matches('/'), encoded)
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    pub fn new(
        client: S3Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn backend_error<E>(operation: &'static str, key: &str, err: E) -> StorageError
    where
        E: std::error::Error,
    {
        StorageError::Backend {
            operation,
            key: key.to_string(),
            message: DisplayErrorContext(err).to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, upload: ObjectUpload) -> StorageResult<()> {
        let ObjectUpload {
            key,
            bytes,
            content_type,
            content_disposition,
        } = upload;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .cache_control(PUBLISHED_CACHE_CONTROL)
            .set_content_type(content_type)
            .set_content_disposition(content_disposition)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| Self::backend_error("upload", &key, err))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    return Err(StorageError::Missing(key.to_string()));
                }
                return Err(Self::backend_error("download", key, service));
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|err| Self::backend_error("read", key, err))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| Self::backend_error("delete", key, err))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(&self.public_base_url, key)
    }
}
