//! Data directory layout
//!
//! `<data_dir>/` holds `config.json`, the `users.json` snapshot, the optional
//! `loading.gif`, and `prompts/` with one text file per prompt-backed mode.

pub mod templates;

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::policy::ModeRegistry;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to create directory: {0:?}")]
    DirectoryCreationFailed(PathBuf, #[source] std::io::Error),

    #[error("Failed to create prompt file {0}: {1:?}")]
    FileCreationFailed(String, PathBuf, #[source] std::io::Error),

    #[error("Failed to set permissions for {0}: {1}")]
    PermissionError(String, #[source] std::io::Error),
}

/// Creates the data directory and its `prompts/` subdirectory with the
/// starter prompt files. Existing files are preserved.
pub fn initialize_workspace(base_path: &Path, verbose: bool) -> Result<()> {
    create_dir(base_path, 0o700, verbose)?;
    initialize_prompts(&base_path.join("prompts"), verbose)?;

    if verbose {
        tracing::info!("Workspace initialization complete");
    }
    Ok(())
}

/// Writes every starter prompt that does not exist yet into `prompts_dir`.
///
/// Returns the number of files created.
pub fn initialize_prompts(prompts_dir: &Path, verbose: bool) -> Result<usize> {
    create_dir(prompts_dir, 0o755, verbose)?;

    let mut created = 0;
    for (filename, content) in templates::PROMPT_TEMPLATES {
        let file_path = prompts_dir.join(filename);

        if file_path.exists() {
            if verbose {
                tracing::info!(path = %file_path.display(), "Prompt file already exists (preserved)");
            }
            continue;
        }

        fs::write(&file_path, content).map_err(|e| {
            WorkspaceError::FileCreationFailed(filename.to_string(), file_path.clone(), e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o644);
            fs::set_permissions(&file_path, permissions)
                .map_err(|e| WorkspaceError::PermissionError(filename.to_string(), e))?;
        }

        if verbose {
            tracing::info!(path = %file_path.display(), "Created prompt file");
        }
        created += 1;
    }

    Ok(created)
}

/// Prompt files referenced by `registry` that are absent from its
/// prompts directory
pub fn missing_prompt_files(registry: &ModeRegistry) -> Vec<String> {
    registry
        .prompt_files()
        .into_iter()
        .filter(|file| !registry.prompts_dir().join(file).exists())
        .map(str::to_string)
        .collect()
}

fn create_dir(path: &Path, mode: u32, verbose: bool) -> Result<()> {
    if path.exists() {
        if verbose {
            tracing::info!(path = %path.display(), "Directory already exists");
        }
        return Ok(());
    }

    fs::create_dir_all(path)
        .map_err(|e| WorkspaceError::DirectoryCreationFailed(path.to_path_buf(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| WorkspaceError::PermissionError(path.display().to_string(), e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    if verbose {
        tracing::info!(path = %path.display(), "Created directory");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_workspace_creates_prompts() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().join("azalea");

        initialize_workspace(&base_path, false).unwrap();

        for (filename, content) in templates::PROMPT_TEMPLATES {
            let path = base_path.join("prompts").join(filename);
            assert_eq!(fs::read_to_string(path).unwrap(), content);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&base_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_initialize_preserves_existing_prompts() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join("prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join("god.txt"), "Custom god").unwrap();

        let created = initialize_prompts(&prompts_dir, false).unwrap();

        assert_eq!(created, templates::PROMPT_TEMPLATES.len() - 1);
        assert_eq!(
            fs::read_to_string(prompts_dir.join("god.txt")).unwrap(),
            "Custom god"
        );
    }

    #[test]
    fn test_initialize_twice_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join("prompts");

        initialize_prompts(&prompts_dir, false).unwrap();
        assert_eq!(initialize_prompts(&prompts_dir, false).unwrap(), 0);
    }

    #[test]
    fn test_every_registry_prompt_has_a_template() {
        let registry = ModeRegistry::builtin("/unused");
        for file in registry.prompt_files() {
            assert!(
                templates::template_for(file).is_some(),
                "{} has no starter template",
                file
            );
        }
        assert_eq!(registry.prompt_files().len(), templates::PROMPT_TEMPLATES.len());
    }

    #[test]
    fn test_missing_prompt_files() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join("prompts");
        let registry = ModeRegistry::builtin(&prompts_dir);

        assert_eq!(missing_prompt_files(&registry).len(), 10);

        initialize_prompts(&prompts_dir, false).unwrap();
        fs::remove_file(prompts_dir.join("smart.txt")).unwrap();

        assert_eq!(missing_prompt_files(&registry), vec!["smart.txt".to_string()]);
    }
}
