//! Voice listing for the `list_voices` task

use std::collections::BTreeMap;
use std::path::Path;

use eloquent_common::ObjectStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::has_audio_extension;

const REMOTE_DESCRIPTION: &str = "Cloud voice";
const PRESET_DESCRIPTION: &str = "Local preset voice";

/// One selectable voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl VoiceInfo {
    fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            description: description.to_string(),
        }
    }
}

/// Remote voices merged with local presets, sorted by id
///
/// Remote ids are the first path segment under `reference_prefix`
/// (`references/<id>/...`) or the stem of a flat audio object
/// (`references/<id>.wav`). A voice present in both places is reported as
/// remote. Remote listing failures are logged; presets are still returned.
pub async fn list_voices(
    store: Option<&dyn ObjectStore>,
    reference_prefix: &str,
    presets_dir: &Path,
) -> Vec<VoiceInfo> {
    let mut voices: BTreeMap<String, VoiceInfo> = BTreeMap::new();

    for id in list_presets(presets_dir).await {
        voices.insert(id.clone(), VoiceInfo::new(&id, PRESET_DESCRIPTION));
    }

    if let Some(store) = store {
        let prefix = format!("{}/", reference_prefix.trim_end_matches('/'));
        match store.list(&prefix).await {
            Ok(keys) => {
                for id in keys.iter().filter_map(|k| remote_voice_id(k, &prefix)) {
                    voices.insert(id.to_string(), VoiceInfo::new(id, REMOTE_DESCRIPTION));
                }
            }
            Err(e) => warn!("Listing remote voices in {} failed: {}", store.name(), e),
        }
    }

    debug!("Listed {} voices", voices.len());
    voices.into_values().collect()
}

fn remote_voice_id<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let rest = key.strip_prefix(prefix)?;
    match rest.split_once('/') {
        Some((id, _)) if !id.is_empty() => Some(id),
        Some(_) => None,
        None if has_audio_extension(rest) => rest.rsplit_once('.').map(|(stem, _)| stem),
        None => None,
    }
}

async fn list_presets(presets_dir: &Path) -> Vec<String> {
    let mut ids = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(presets_dir).await else {
        debug!("No preset directory at {}", presets_dir.display());
        return ids;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_voice_id_forms() {
        let prefix = "references/";
        assert_eq!(remote_voice_id("references/bob/bob.wav", prefix), Some("bob"));
        assert_eq!(remote_voice_id("references/amy.flac", prefix), Some("amy"));
        assert_eq!(remote_voice_id("references/readme.txt", prefix), None);
        assert_eq!(remote_voice_id("references//x.wav", prefix), None);
        assert_eq!(remote_voice_id("cache/archive.tar.gz", prefix), None);
    }
}
