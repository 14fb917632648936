use std::io::Write;
use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

/// Object key for an exported file: `exports/instructor_id=<id>/<file>[.gz]`.
pub fn export_key(instructor_id: &str, file_name: &str, gzip: bool) -> String {
    let suffix = if gzip { ".gz" } else { "" };
    format!("exports/instructor_id={instructor_id}/{file_name}{suffix}")
}

pub fn gzip_bytes(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Uploads a CSV export, optionally gzip-compressed. Returns the object key.
#[tracing::instrument(skip(client), fields(path = %path.display()))]
pub async fn upload_export(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    instructor_id: &str,
    path: &Path,
    gzip: bool,
) -> anyhow::Result<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("export path has no file name: {}", path.display()))?;

    let contents = std::fs::read(path)?;
    let body = if gzip { gzip_bytes(&contents)? } else { contents };
    let key = export_key(instructor_id, file_name, gzip);

    client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .content_type(if gzip { "application/gzip" } else { "text/csv" })
        .body(ByteStream::from(body))
        .send()
        .await?;

    info!(bucket, key = %key, "Export uploaded");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_export_key_layout() {
        assert_eq!(
            export_key("inst-1", "stats.csv", false),
            "exports/instructor_id=inst-1/stats.csv"
        );
        assert_eq!(
            export_key("inst-1", "stats.csv", true),
            "exports/instructor_id=inst-1/stats.csv.gz"
        );
    }

    #[test]
    fn test_gzip_bytes_decompresses_back() {
        let compressed = gzip_bytes(b"year,round\n2024,1\n").unwrap();
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "year,round\n2024,1\n");
    }
}
