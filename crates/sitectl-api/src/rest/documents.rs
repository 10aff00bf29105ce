// Documents endpoints
//
// Base path: /documents/api/1.2/
// Users, groups, folder sharing and file/folder transfer.

use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::types::{
    Collection, DocFile, DocFolder, DocGroup, DocUser, FolderItem, FolderMember, ShareResult,
};

const DOCS: &str = "/documents/api/1.2";

/// The caller's home folder.
pub const HOME_FOLDER: &str = "self";

impl RestClient {
    // ── Principals ───────────────────────────────────────────────────

    /// Users whose name matches `query`. The match is fuzzy; callers
    /// compare `loginName` themselves.
    pub async fn search_users(&self, query: &str) -> Result<Vec<DocUser>, Error> {
        let page: Collection<DocUser> = self
            .get_with_params(&format!("{DOCS}/users/items"), &[("info", query.to_owned())])
            .await?;
        Ok(page.items)
    }

    pub async fn groups(&self) -> Result<Vec<DocGroup>, Error> {
        let page: Collection<DocGroup> = self
            .get_with_params(&format!("{DOCS}/groups/items"), &[("limit", "500".into())])
            .await?;
        Ok(page.items)
    }

    // ── Sharing ──────────────────────────────────────────────────────

    pub async fn folder_members(&self, folder_id: &str) -> Result<Vec<FolderMember>, Error> {
        let page: Collection<FolderMember> =
            self.get(&format!("{DOCS}/shares/{folder_id}/items")).await?;
        Ok(page.items)
    }

    /// Grant `role` on a folder. `create` adds a new member; otherwise the
    /// existing member's role is changed.
    pub async fn share_folder(
        &self,
        folder_id: &str,
        principal_id: &str,
        role: &str,
        create: bool,
    ) -> Result<ShareResult, Error> {
        let body = json!({ "userID": principal_id, "role": role });
        if create {
            self.post(&format!("{DOCS}/shares/{folder_id}"), &body).await
        } else {
            self.put(&format!("{DOCS}/shares/{folder_id}/role"), &body)
                .await
        }
    }

    pub async fn unshare_folder(
        &self,
        folder_id: &str,
        principal_id: &str,
    ) -> Result<ShareResult, Error> {
        self.delete_with_response(
            &format!("{DOCS}/shares/{folder_id}/user"),
            &[("userID", principal_id.to_owned())],
        )
        .await
    }

    // ── Files ────────────────────────────────────────────────────────

    /// Upload a local file into a folder (`HOME_FOLDER` for the home).
    pub async fn upload_file(&self, parent_id: &str, path: &Path) -> Result<DocFile, Error> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.upload_bytes(parent_id, &file_name, contents).await
    }

    pub async fn upload_bytes(
        &self,
        parent_id: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<DocFile, Error> {
        let params = json!({ "parentID": parent_id }).to_string();
        let form = Form::new()
            .text("jsonInputParameters", params)
            .part("primaryFile", Part::bytes(contents).file_name(file_name.to_owned()));
        self.post_multipart(&format!("{DOCS}/files/data"), form)
            .await
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Bytes, Error> {
        self.get_bytes(&format!("{DOCS}/files/{file_id}/data")).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), Error> {
        self.delete(&format!("{DOCS}/files/{file_id}")).await
    }

    // ── Folders ──────────────────────────────────────────────────────

    pub async fn folder_items(&self, folder_id: &str) -> Result<Vec<FolderItem>, Error> {
        let page: Collection<FolderItem> = self
            .get_with_params(
                &format!("{DOCS}/folders/{folder_id}/items"),
                &[("limit", "10000".into())],
            )
            .await?;
        Ok(page.items)
    }

    /// A direct child folder by exact name.
    pub async fn find_child_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<FolderItem>, Error> {
        Ok(self
            .folder_items(parent_id)
            .await?
            .into_iter()
            .find(|item| item.is_folder() && item.name == name))
    }

    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<DocFolder, Error> {
        self.post(&format!("{DOCS}/folders/{parent_id}"), &json!({ "name": name }))
            .await
    }

    pub async fn delete_folder(&self, folder_id: &str) -> Result<(), Error> {
        self.delete(&format!("{DOCS}/folders/{folder_id}")).await
    }
}
