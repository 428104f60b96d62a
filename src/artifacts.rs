//! Reading subject images and persisting retrieved results

use crate::error::{RelightError, Result};
use crate::stability::options::OutputFormat;
use crate::stability::types::ResultPayload;
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read the subject image for a submission.
///
/// Returns the bytes and the file name to attach to the multipart field.
/// Missing or empty files are validation errors; nothing goes over the wire.
pub fn read_subject_image(path: &Path) -> Result<(Vec<u8>, String)> {
    if !path.is_file() {
        return Err(RelightError::Validation(format!(
            "image file does not exist: {}",
            path.display()
        )));
    }

    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Err(RelightError::Validation(format!(
            "image file is empty: {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok((bytes, file_name))
}

/// Write a retrieved payload to disk.
///
/// Binary results land in `result_<job_id>.<ext>`; structured results with M
/// artifacts land in `result_<job_id>_<index>.<ext>`, one file per artifact.
/// Index suffixes keep artifacts of one response from colliding; across
/// separate sessions for the same job id, last write wins.
pub fn save_payload(
    dir: &Path,
    job_id: &str,
    payload: &ResultPayload,
    fallback_format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    match payload {
        ResultPayload::Binary {
            content_type,
            bytes,
        } => {
            let ext = extension_for(content_type, fallback_format);
            let path = dir.join(format!("result_{}.{}", job_id, ext));
            fs::write(&path, bytes)?;
            info!("Saved {} bytes to {}", bytes.len(), path.display());
            Ok(vec![path])
        }
        ResultPayload::Structured(result) => {
            let mut saved = Vec::new();
            for (index, artifact) in result.artifacts.iter().enumerate() {
                if artifact.is_filtered() {
                    warn!("Artifact {} was content-filtered by the service, skipping", index);
                    continue;
                }
                let Some(encoded) = &artifact.base64 else {
                    warn!("Artifact {} carries no image data, skipping", index);
                    continue;
                };
                let bytes = general_purpose::STANDARD.decode(encoded)?;
                let path = dir.join(format!(
                    "result_{}_{}.{}",
                    job_id,
                    index,
                    fallback_format.extension()
                ));
                fs::write(&path, &bytes)?;
                info!("Saved {} bytes to {}", bytes.len(), path.display());
                saved.push(path);
            }
            if saved.is_empty() {
                warn!("Structured result contained no decodable artifacts");
            }
            Ok(saved)
        }
    }
}

/// Output path for the synchronous remove-background flow, derived from the
/// input file name.
pub fn remove_background_path(dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("{}_nobg.{}", stem, format.extension()))
}

/// Map a declared content type to a file extension, falling back to the
/// requested output format when the type is unknown.
fn extension_for(content_type: &str, fallback: OutputFormat) -> &'static str {
    let subtype = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .strip_prefix("image/")
        .unwrap_or_default();

    match subtype {
        "png" => "png",
        "jpeg" | "jpg" => "jpeg",
        "webp" => "webp",
        _ => fallback.extension(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::types::{ResultArtifact, StructuredResult};
    use base64::{engine::general_purpose, Engine as _};
    use tempfile::tempdir;

    fn artifact(data: &[u8]) -> ResultArtifact {
        ResultArtifact {
            base64: Some(general_purpose::STANDARD.encode(data)),
            seed: Some(7),
            finish_reason: Some("SUCCESS".to_string()),
        }
    }

    #[test]
    fn binary_payload_named_from_job_id() {
        let dir = tempdir().unwrap();
        let payload = ResultPayload::Binary {
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3, 4],
        };

        let saved = save_payload(dir.path(), "abc123", &payload, OutputFormat::Png).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0], dir.path().join("result_abc123.png"));
        assert_eq!(fs::read(&saved[0]).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn binary_extension_follows_content_type_over_requested_format() {
        let dir = tempdir().unwrap();
        let payload = ResultPayload::Binary {
            content_type: "image/webp".to_string(),
            bytes: vec![9],
        };

        let saved = save_payload(dir.path(), "abc123", &payload, OutputFormat::Png).unwrap();
        assert_eq!(saved[0], dir.path().join("result_abc123.webp"));
    }

    #[test]
    fn structured_payload_saves_one_file_per_artifact() {
        let dir = tempdir().unwrap();
        let payload = ResultPayload::Structured(StructuredResult {
            artifacts: vec![artifact(b"first"), artifact(b"second"), artifact(b"third")],
        });

        let saved = save_payload(dir.path(), "job9", &payload, OutputFormat::Png).unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[0], dir.path().join("result_job9_0.png"));
        assert_eq!(saved[2], dir.path().join("result_job9_2.png"));
        assert_eq!(fs::read(&saved[1]).unwrap(), b"second");
    }

    #[test]
    fn filtered_artifacts_are_skipped_with_stable_indices() {
        let dir = tempdir().unwrap();
        let filtered = ResultArtifact {
            base64: None,
            seed: None,
            finish_reason: Some("CONTENT_FILTERED".to_string()),
        };
        let payload = ResultPayload::Structured(StructuredResult {
            artifacts: vec![artifact(b"kept-a"), filtered, artifact(b"kept-b")],
        });

        let saved = save_payload(dir.path(), "job9", &payload, OutputFormat::Jpeg).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0], dir.path().join("result_job9_0.jpeg"));
        assert_eq!(saved[1], dir.path().join("result_job9_2.jpeg"));
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let dir = tempdir().unwrap();
        let payload = ResultPayload::Structured(StructuredResult {
            artifacts: vec![ResultArtifact {
                base64: Some("not!!valid##base64".to_string()),
                seed: None,
                finish_reason: None,
            }],
        });

        let result = save_payload(dir.path(), "job9", &payload, OutputFormat::Png);
        assert!(matches!(result, Err(RelightError::ArtifactDecode(_))));
    }

    #[test]
    fn read_subject_image_rejects_missing_and_empty_files() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("nope.png");
        assert!(matches!(
            read_subject_image(&missing),
            Err(RelightError::Validation(_))
        ));

        let empty = dir.path().join("empty.png");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(
            read_subject_image(&empty),
            Err(RelightError::Validation(_))
        ));

        let good = dir.path().join("subject.png");
        fs::write(&good, b"\x89PNG").unwrap();
        let (bytes, name) = read_subject_image(&good).unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert_eq!(name, "subject.png");
    }

    #[test]
    fn remove_background_path_uses_input_stem() {
        let path = remove_background_path(
            Path::new("out"),
            Path::new("photos/portrait.jpg"),
            OutputFormat::Png,
        );
        assert_eq!(path, Path::new("out").join("portrait_nobg.png"));
    }

    #[test]
    fn unknown_content_type_falls_back_to_requested_format() {
        assert_eq!(extension_for("application/octet-stream", OutputFormat::Webp), "webp");
        assert_eq!(extension_for("image/png; charset=binary", OutputFormat::Webp), "png");
        assert_eq!(extension_for("image/jpg", OutputFormat::Png), "jpeg");
    }
}
