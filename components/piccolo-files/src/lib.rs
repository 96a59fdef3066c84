extern crate serde;

#[macro_use]
extern crate serde_derive;

mod network_manifest;
mod project_manifest;

pub use network_manifest::{
    AccountConfig, FlowNetwork, NetworkConfig, NetworkManifest, NetworkManifestFile,
    DEFAULT_HASH_ALGORITHM, DEFAULT_SIGNATURE_ALGORITHM,
};
pub use project_manifest::{
    ContractConfig, ContractDeploymentConfig, DeploymentConfig, ProjectConfig, ProjectManifest,
    ProjectManifestFile,
};

use std::borrow::BorrowMut;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const DEFAULT_PROJECT_MANIFEST_NAME: &str = "Piccolo.toml";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    pub fn try_parse(
        location_string: &str,
        project_root_location_hint: Option<&FileLocation>,
    ) -> Option<FileLocation> {
        let location = FileLocation::from_path_string(location_string).ok()?;
        match (project_root_location_hint, location.path.is_relative()) {
            (None, true) => None,
            (Some(hint), true) => {
                let mut location = hint.clone();
                location.append_path(location_string).ok()?;
                Some(location)
            }
            (_, false) => Some(location),
        }
    }

    pub fn from_path(path: PathBuf) -> FileLocation {
        FileLocation { path }
    }

    pub fn from_path_string(path_string: &str) -> Result<FileLocation, String> {
        let path = PathBuf::from_str(path_string)
            .map_err(|e| format!("unable to parse {} as a path\n{:?}", path_string, e))?;
        Ok(FileLocation { path })
    }

    pub fn append_path(&mut self, path_string: &str) -> Result<(), String> {
        let path_to_append = PathBuf::from_str(path_string)
            .map_err(|e| format!("unable to read relative path {}\n{:?}", path_string, e))?;
        self.borrow_mut().path.extend(&path_to_append);
        Ok(())
    }

    pub fn get_parent_location(&self) -> Result<FileLocation, String> {
        let mut parent_location = self.clone();
        let mut parent = parent_location.path.clone();
        parent.pop();
        if parent.to_str() == parent_location.path.to_str() {
            return Err(String::from("reached root"));
        }
        parent_location.path.pop();
        Ok(parent_location)
    }

    pub fn get_project_root_location(&self) -> Result<FileLocation, String> {
        let mut project_root_location = self.clone();
        let path = &mut project_root_location.path;
        let mut manifest_found = false;
        while path.pop() {
            path.push(DEFAULT_PROJECT_MANIFEST_NAME);
            if path.exists() {
                path.pop();
                manifest_found = true;
                break;
            }
            path.pop();
        }

        match manifest_found {
            true => Ok(project_root_location),
            false => Err(format!("unable to find root location from {}", self)),
        }
    }

    pub fn get_relative_path_from_base(
        &self,
        base_location: &FileLocation,
    ) -> Result<String, String> {
        let file = self.to_string();
        let base = base_location.to_string();
        if !file.starts_with(&base) {
            return Err(format!("{} is not contained in {}", file, base));
        }
        Ok(file[(base.len() + 1)..].to_string())
    }

    pub fn get_file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .and_then(|f| Some(f.to_str()?.to_string()))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn read_content(&self) -> Result<Vec<u8>, String> {
        use std::fs::File;
        use std::io::{BufReader, Read};
        let file = File::open(&self.path)
            .map_err(|e| format!("unable to read file {}\n{:?}", self.path.display(), e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read file {}\n{:?}", self.path.display(), e))?;
        Ok(file_buffer)
    }

    pub fn read_content_as_utf8(&self) -> Result<String, String> {
        let content = self.read_content()?;
        String::from_utf8(content)
            .map_err(|e| format!("unable to read content as utf8 {}\n{:?}", self, e))
    }

    pub fn write_content(&self, content: &[u8]) -> Result<(), String> {
        use std::fs::{self, File};
        use std::io::Write;
        let mut parent_directory = self.path.clone();
        parent_directory.pop();
        fs::create_dir_all(&parent_directory).map_err(|e| {
            format!(
                "unable to create parent directory {}\n{}",
                parent_directory.display(),
                e
            )
        })?;
        let mut file = File::create(&self.path)
            .map_err(|e| format!("unable to open file {}\n{}", self.path.display(), e))?;
        file.write_all(content)
            .map_err(|e| format!("unable to write file {}\n{}", self.path.display(), e))?;
        Ok(())
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl Serialize for FileLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("path", &self.to_string())?;
        map.end()
    }
}

/// Lexically cleans a path: resolves `.` and `..` components without
/// touching the filesystem. Import locations are compared with this
/// normalization on both sides of the table.
pub fn clean_path(path: &str) -> String {
    let mut components: Vec<String> = vec![];
    let absolute = path.starts_with('/');
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = components.last().cloned();
                match last.as_deref() {
                    Some("..") | None if !absolute => components.push("..".to_string()),
                    Some(_) => {
                        components.pop();
                    }
                    None => {}
                };
            }
            Component::Normal(part) => {
                components.push(part.to_string_lossy().to_string());
            }
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let joined = components.join("/");
    match (absolute, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Resolves `relative` against the directory of `base`, then cleans the
/// result. This is the canonical form used as key in location tables.
pub fn canonicalize_location(base: &str, relative: &str) -> String {
    let base_dir = match Path::new(base).parent() {
        Some(parent) => parent.to_string_lossy().to_string(),
        None => String::new(),
    };
    if base_dir.is_empty() {
        clean_path(relative)
    } else {
        clean_path(&format!("{}/{}", base_dir, relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./contracts/hello.cdc"), "contracts/hello.cdc");
        assert_eq!(clean_path("contracts/../hello.cdc"), "hello.cdc");
        assert_eq!(clean_path("/a/b/./c"), "/a/b/c");
        assert_eq!(clean_path("/a/b/../c"), "/a/c");
        assert_eq!(clean_path("."), ".");
    }

    #[test]
    fn test_canonicalize_location() {
        assert_eq!(
            canonicalize_location("contracts/contractC.cdc", "./contractA.cdc"),
            "contracts/contractA.cdc"
        );
        assert_eq!(
            canonicalize_location("contracts/nested/c.cdc", "../a.cdc"),
            "contracts/a.cdc"
        );
        assert_eq!(canonicalize_location("hello.cdc", "./other.cdc"), "other.cdc");
    }
}
