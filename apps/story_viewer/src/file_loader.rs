use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use client_core::StoryLoader;
use shared::{
    domain::{Story, StoryId},
    protocol::StoryResponse,
};

/// Serves a single story from a JSON file shaped like the API response.
pub struct FileStoryLoader {
    path: PathBuf,
}

impl FileStoryLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn read(&self) -> Result<Story> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read story file {}", self.path.display()))?;
        let response: StoryResponse = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse story file {}", self.path.display()))?;
        Ok(response.into())
    }
}

#[async_trait]
impl StoryLoader for FileStoryLoader {
    async fn load_story(&self, story_id: StoryId) -> Result<Story> {
        let story = self.read().await?;
        if story.id != story_id {
            bail!(
                "story file {} holds story {} not {story_id}",
                self.path.display(),
                story.id
            );
        }
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn write_story_file(story_id: StoryId) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("story_viewer_story_{suffix}.json"));
        let body = serde_json::json!({
            "id": story_id,
            "user_id": 4,
            "frames": [{"id": StoryId::new_random(), "kind": "text", "content": "hi"}]
        });
        std::fs::write(&path, body.to_string()).expect("write story");
        path
    }

    #[tokio::test]
    async fn loads_matching_story_and_rejects_other_ids() {
        let story_id = StoryId::new_random();
        let path = write_story_file(story_id);
        let loader = FileStoryLoader::new(&path);

        let story = loader.load_story(story_id).await.expect("load");
        assert_eq!(story.frame_count(), 1);

        let err = loader
            .load_story(StoryId::new_random())
            .await
            .expect_err("mismatch");
        assert!(err.to_string().contains("holds story"));

        std::fs::remove_file(path).expect("cleanup");
    }
}
