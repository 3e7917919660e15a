use crate::models::{ObjectRecord, PutReceipt};
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Characters left as-is inside a URL path segment.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Headers attached to an uploaded object.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
}

/// The object store as seen by the pipeline.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Lists every object under `prefix`, following pagination to the end.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>>;

    async fn get_object_stream(&self, key: &str) -> Result<Pin<Box<dyn AsyncRead + Send>>>;

    async fn put_object(&self, key: &str, data: Vec<u8>, options: PutOptions)
    -> Result<PutReceipt>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3StorageService {
    /// `base_url` is where objects of `bucket` are reachable, without a trailing slash.
    pub fn new(client: Client, bucket: String, base_url: String) -> Self {
        Self {
            client,
            bucket,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        object_url(&self.base_url, key)
    }
}

pub fn object_url(base_url: &str, key: &str) -> String {
    let path = key
        .split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectRecord>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                for object in contents {
                    let Some(key) = object.key else { continue };
                    let last_modified = object.last_modified.and_then(|d| {
                        chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
                    });
                    objects.push(ObjectRecord {
                        key,
                        size: object.size.unwrap_or(0),
                        last_modified,
                        e_tag: object.e_tag,
                    });
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object_stream(&self, key: &str) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(res.body.into_async_read());
        Ok(reader)
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutReceipt> {
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .set_content_encoding(options.content_encoding)
            .set_content_type(options.content_type)
            .send()
            .await;

        let output = match res {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(
                    "S3 put_object failed: bucket={}, key={}, error={:?}",
                    self.bucket,
                    key,
                    e
                );
                return Err(e.into());
            }
        };

        Ok(PutReceipt {
            key: key.to_string(),
            location: self.object_url(key),
            e_tag: output.e_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_segments() {
        assert_eq!(
            object_url("https://uploads.s3.eu-west-1.amazonaws.com/", "a b/c-mobile.jpg"),
            "https://uploads.s3.eu-west-1.amazonaws.com/a%20b/c-mobile.jpg"
        );
        assert_eq!(
            object_url("http://127.0.0.1:9000/uploads", "x+y.png"),
            "http://127.0.0.1:9000/uploads/x%2By.png"
        );
    }
}
