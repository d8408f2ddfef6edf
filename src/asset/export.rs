//! Named field views used to serialize assets.
//!
//! The private view carries everything needed to rebuild an asset and is
//! meant for persistence. The public view is what clients get to see.

use super::{AssetMime, SlideAsset};
use serde_json::{Map, Value, json};
use std::{fmt, path::PathBuf};
use thiserror::Error;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportView {
    Public,
    Private,
}

impl fmt::Display for ExportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportView::Public => f.write_str("public"),
            ExportView::Private => f.write_str("private"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Field '{field}' is not part of the {view} view")]
    NotInView { field: String, view: ExportView },
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Field access by name for a type with public and private views.
pub trait Exportable {
    type Field: Copy + 'static;

    /// Ordered fields making up `view`.
    fn fields(view: ExportView) -> &'static [Self::Field];

    fn field_name(field: Self::Field) -> &'static str;

    fn export_get(&self, field: Self::Field) -> Value;

    fn export_set(&mut self, field: Self::Field, value: Value) -> Result<(), ExportError>;

    fn export(&self, view: ExportView) -> Map<String, Value> {
        Self::fields(view)
            .iter()
            .map(|&field| (Self::field_name(field).to_string(), self.export_get(field)))
            .collect()
    }

    fn import(&mut self, view: ExportView, data: &Map<String, Value>) -> Result<(), ExportError> {
        let fields = Self::fields(view);
        for (key, value) in data {
            let field = fields
                .iter()
                .copied()
                .find(|&field| Self::field_name(field) == key)
                .ok_or_else(|| ExportError::NotInView {
                    field: key.clone(),
                    view,
                })?;
            self.export_set(field, value.clone())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetField {
    Mime,
    Filename,
    Uid,
    InternalName,
    FullPath,
}

const PRIVATE_FIELDS: &[AssetField] = &[
    AssetField::Mime,
    AssetField::Filename,
    AssetField::Uid,
    AssetField::InternalName,
    AssetField::FullPath,
];

const PUBLIC_FIELDS: &[AssetField] = &[AssetField::Mime, AssetField::Filename];

impl AssetField {
    pub fn name(self) -> &'static str {
        match self {
            AssetField::Mime => "mime",
            AssetField::Filename => "filename",
            AssetField::Uid => "uid",
            AssetField::InternalName => "intname",
            AssetField::FullPath => "fullpath",
        }
    }
}

impl Exportable for SlideAsset {
    type Field = AssetField;

    fn fields(view: ExportView) -> &'static [AssetField] {
        match view {
            ExportView::Public => PUBLIC_FIELDS,
            ExportView::Private => PRIVATE_FIELDS,
        }
    }

    fn field_name(field: AssetField) -> &'static str {
        field.name()
    }

    fn export_get(&self, field: AssetField) -> Value {
        match field {
            AssetField::Mime => json!(self.mime),
            AssetField::Filename => json!(self.filename),
            AssetField::Uid => json!(self.uid),
            AssetField::InternalName => json!(self.internal_name),
            AssetField::FullPath => json!(
                self.full_path
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned())
            ),
        }
    }

    fn export_set(&mut self, field: AssetField, value: Value) -> Result<(), ExportError> {
        match field {
            AssetField::Mime => {
                self.mime = serde_json::from_value::<Option<AssetMime>>(value).map_err(|e| {
                    ExportError::InvalidValue {
                        field: field.name(),
                        reason: e.to_string(),
                    }
                })?;
            }
            AssetField::Filename => self.filename = string_value(field, value)?,
            AssetField::Uid => self.uid = string_value(field, value)?,
            AssetField::InternalName => self.internal_name = string_value(field, value)?,
            AssetField::FullPath => {
                let path = string_value(field, value)?;
                self.full_path = (!path.is_empty()).then(|| PathBuf::from(path));
            }
        }
        Ok(())
    }
}

/// Strings are taken as is, null clears the field.
fn string_value(field: AssetField, value: Value) -> Result<String, ExportError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(ExportError::InvalidValue {
            field: field.name(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::tests::{samples, upload},
        config::Limits,
    };

    fn stored_asset() -> (SlideAsset, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let file = upload(&dir, "uploads/title card.jpg", samples::JPEG);
        let asset = SlideAsset::create(&file, dir.path(), &Limits::default()).unwrap();
        (asset, dir)
    }

    #[test]
    fn public_view_hides_storage_layout() {
        let (asset, _dir) = stored_asset();
        let public = asset.export(ExportView::Public);

        assert_eq!(public.len(), 2);
        assert_eq!(public["mime"], "image/jpeg");
        assert_eq!(public["filename"], "title card.jpg");
        for hidden in ["uid", "intname", "fullpath"] {
            assert!(!public.contains_key(hidden));
        }
    }

    #[test]
    fn private_view_has_every_field() {
        let (asset, _dir) = stored_asset();
        let private = asset.export(ExportView::Private);

        let mut keys: Vec<_> = private.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["filename", "fullpath", "intname", "mime", "uid"]);
        assert_eq!(private["uid"], asset.uid());
        assert_eq!(private["intname"], asset.internal_name());
        assert_eq!(
            private["fullpath"],
            &*asset.full_path().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn private_view_rebuilds_the_asset() {
        let (asset, _dir) = stored_asset();
        let mut restored = SlideAsset::default();
        restored
            .import(ExportView::Private, &asset.export(ExportView::Private))
            .unwrap();
        assert_eq!(restored, asset);
    }

    #[test]
    fn import_rejects_fields_outside_the_view() {
        let (asset, _dir) = stored_asset();
        let mut restored = SlideAsset::default();
        let err = restored
            .import(ExportView::Public, &asset.export(ExportView::Private))
            .unwrap_err();
        assert!(matches!(err, ExportError::NotInView { view: ExportView::Public, .. }));
    }

    #[test]
    fn set_validates_values() {
        let mut asset = SlideAsset::default();

        assert!(asset.export_set(AssetField::Mime, json!("application/pdf")).is_err());
        assert!(asset.export_set(AssetField::Uid, json!(42)).is_err());

        asset.export_set(AssetField::Mime, json!("video/ogg")).unwrap();
        assert_eq!(asset.mime(), Some(AssetMime::Ogg));

        asset.export_set(AssetField::FullPath, json!("/srv/a.ogg")).unwrap();
        asset.export_set(AssetField::FullPath, Value::Null).unwrap();
        assert_eq!(asset.full_path(), None);
        assert_eq!(asset.export_get(AssetField::FullPath), Value::Null);
    }
}
