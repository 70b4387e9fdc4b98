use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{JunkyardError, Result};

/// Abstract encoder command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new encoder command
    pub fn new<P: Into<PathBuf>, S: Into<String>>(binary_path: P, description: S) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            envs: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the child process
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Execute the command and wait for it, returning captured stdout.
    ///
    /// The child is killed if the returned future is dropped, which is how a
    /// cancelled job stops a running encode.
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing encoder command: {} {:?}", self.binary_path.display(), self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| JunkyardError::Encoder(format!("Failed to execute encoder: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JunkyardError::Encoder(format!(
                "{} failed with {}: {}",
                self.description,
                output.status,
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the encoder invocations the toolbox needs
pub struct MediaCommandBuilder {
    binary_path: PathBuf,
    envs: Vec<(String, String)>,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<P: Into<PathBuf>>(binary_path: P) -> Self {
        Self {
            binary_path: binary_path.into(),
            envs: Vec::new(),
        }
    }

    /// Environment applied to every command built afterwards
    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn command<S: Into<String>>(&self, description: S) -> MediaCommand {
        self.envs
            .iter()
            .fold(MediaCommand::new(&self.binary_path, description), |cmd, (k, v)| {
                cmd.env(k.as_str(), v.as_str())
            })
    }

    /// `-y -i <input> -c:v <codec> -c:a aac <output>`
    pub fn transcode<P: AsRef<Path>>(&self, input_path: P, output_path: P, video_codec: &str) -> MediaCommand {
        self.command(format!("Transcode with {}", video_codec))
            .overwrite()
            .input(input_path)
            .video_codec(video_codec)
            .audio_codec("aac")
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        self.command("Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_argument_vector() {
        let cmd = MediaCommandBuilder::new("ffmpeg").transcode("in.avi", "in.mp4", "libx264");
        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.avi", "-c:v", "libx264", "-c:a", "aac", "in.mp4"]
        );
        assert_eq!(cmd.binary_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_builder_env_applies_to_commands() {
        let cmd = MediaCommandBuilder::new("ffmpeg")
            .with_env("LD_LIBRARY_PATH", "/opt/ffmpeg")
            .version_check();
        assert_eq!(cmd.args, vec!["-version"]);
        assert_eq!(cmd.envs, vec![("LD_LIBRARY_PATH".to_string(), "/opt/ffmpeg".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_encoder_error() {
        let result = MediaCommand::new("/nonexistent/junkyard-encoder", "Probe")
            .arg("-version")
            .execute()
            .await;
        assert!(matches!(result, Err(JunkyardError::Encoder(_))));
    }
}
