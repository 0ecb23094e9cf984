// src/backend/services/share_link.rs
// Capability links: `{base}/view/{id}?permission={view|download}`.
//
// Anyone holding a link can resolve it. The audience chosen when sharing is
// advisory and never changes the link.

use crate::error::LibraryError;
use crate::models::common::Permission;
use crate::models::content_record::ContentSummary;
use crate::models::share::{ShareDescriptor, ShareTarget, SharedView};
use crate::services::expiry::is_expired;
use crate::services::registry::ContentRegistry;
use crate::storage::kv_store::KvStore;
use url::Url;

const VIEW_SEGMENT: &str = "view";
const PERMISSION_PARAM: &str = "permission";
/// Ids a link path cannot carry: URL parsing drops dot segments and
/// `view` would be mistaken for the marker segment.
const RESERVED_IDS: &[&str] = &["", ".", "..", VIEW_SEGMENT];

/// Media types rendered inline by the viewer.
const PREVIEWABLE_MEDIA_TYPES: &[&str] = &["image", "jpg", "jpeg", "png", "gif"];
/// Inline previews larger than this are left out of the resolved view; the
/// viewer fetches the image through the chunked download instead.
pub const MAX_PREVIEW_CHARS: usize = 1024 * 1024;

/// Builds the share link for `descriptor` on top of `base_url`.
pub fn encode(base_url: &str, descriptor: &ShareDescriptor) -> Result<String, LibraryError> {
    if RESERVED_IDS.contains(&descriptor.target_id.as_str()) {
        return Err(LibraryError::InvalidInput(format!(
            "Share target id {:?} cannot appear in a link",
            descriptor.target_id
        )));
    }
    let mut url = Url::parse(base_url)
        .map_err(|e| LibraryError::InvalidInput(format!("Invalid share base URL {}: {}", base_url, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| LibraryError::InvalidInput(format!("Share base URL {} cannot carry a path", base_url)))?;
        segments.pop_if_empty().push(VIEW_SEGMENT).push(&descriptor.target_id);
    }
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair(PERMISSION_PARAM, descriptor.permission.as_str());
    Ok(url.into())
}

/// Extracts the record id and permission from a share link. A missing or
/// unrecognized permission reads as `view`.
pub fn decode(link: &str) -> Result<ShareTarget, LibraryError> {
    let url = Url::parse(link).map_err(|e| LibraryError::InvalidShareLink(format!("{}: {}", link, e)))?;
    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .map(|s| urlencoding::decode(s).map_or_else(|_| s.to_string(), |d| d.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let view_at = segments
        .iter()
        .rposition(|s| s == VIEW_SEGMENT)
        .ok_or_else(|| LibraryError::InvalidShareLink(format!("{}: no /view/ segment", link)))?;
    let id = segments
        .get(view_at + 1)
        .filter(|id| !id.is_empty())
        .cloned()
        .ok_or_else(|| LibraryError::InvalidShareLink(format!("{}: no content id", link)))?;

    let permission = url
        .query_pairs()
        .find(|(key, _)| key == PERMISSION_PARAM)
        .and_then(|(_, value)| Permission::parse(&value))
        .unwrap_or_default();

    Ok(ShareTarget { id, permission })
}

/// Decodes `link` and looks its record up, producing what the viewer shows.
pub fn resolve<S: KvStore>(
    registry: &ContentRegistry<S>,
    link: &str,
    today: &str,
) -> Result<SharedView, LibraryError> {
    let target = decode(link)?;
    let record = registry.get_by_id(&target.id)?;
    let expired = is_expired(record.expiry_date.as_deref(), today);
    let preview = if PREVIEWABLE_MEDIA_TYPES.contains(&record.media_type.as_str())
        && !expired
        && record.payload_len() <= MAX_PREVIEW_CHARS
    {
        record.payload.clone()
    } else {
        None
    };
    Ok(SharedView {
        content: ContentSummary::from_record(record, expired),
        permission: target.permission,
        can_download: target.permission == Permission::Download && record.has_payload() && !expired,
        expired,
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Audience;
    use crate::models::content_record::ContentRecord;
    use crate::storage::kv_store::StableKvStore;
    use crate::storage::persistence::PersistenceAdapter;
    use ic_stable_structures::DefaultMemoryImpl;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://library.example.com";

    fn descriptor(id: &str, permission: Permission) -> ShareDescriptor {
        ShareDescriptor {
            target_id: id.to_string(),
            audience: Audience::External,
            permission,
        }
    }

    #[test]
    fn download_link_decodes_to_its_target() {
        let link = encode(BASE, &descriptor("abc123", Permission::Download)).unwrap();
        assert_eq!(link, "https://library.example.com/view/abc123?permission=download");
        assert_eq!(
            decode(&link).unwrap(),
            ShareTarget {
                id: "abc123".to_string(),
                permission: Permission::Download
            }
        );
    }

    #[test]
    fn audience_does_not_change_the_link() {
        let mut internal = descriptor("abc123", Permission::View);
        internal.audience = Audience::Internal;
        assert_eq!(
            encode(BASE, &internal).unwrap(),
            encode(BASE, &descriptor("abc123", Permission::View)).unwrap()
        );
    }

    #[test]
    fn missing_or_unknown_permission_reads_as_view() {
        for link in [
            "https://library.example.com/view/abc123",
            "https://library.example.com/view/abc123?permission=edit",
            "https://library.example.com/view/abc123?other=1",
        ] {
            assert_eq!(decode(link).unwrap().permission, Permission::View, "{link}");
        }
    }

    #[test]
    fn base_paths_and_odd_ids_survive() {
        let link = encode("https://host/app/", &descriptor("a b/c", Permission::View)).unwrap();
        assert_eq!(link, "https://host/app/view/a%20b%2Fc?permission=view");
        assert_eq!(decode(&link).unwrap().id, "a b/c");
    }

    #[test]
    fn ids_that_would_not_decode_back_are_refused() {
        for id in ["", ".", "..", "view"] {
            assert!(
                matches!(encode(BASE, &descriptor(id, Permission::View)), Err(LibraryError::InvalidInput(_))),
                "{id:?}"
            );
        }
        for id in ["views", "...", "a.b", "view-1"] {
            let link = encode(BASE, &descriptor(id, Permission::Download)).unwrap();
            assert_eq!(decode(&link).unwrap().id, id, "{link}");
        }
    }

    #[test]
    fn malformed_links_are_rejected() {
        assert!(matches!(decode("not a url"), Err(LibraryError::InvalidShareLink(_))));
        assert!(matches!(
            decode("https://library.example.com/share?id=abc"),
            Err(LibraryError::InvalidShareLink(_))
        ));
        assert!(matches!(
            decode("https://library.example.com/view/"),
            Err(LibraryError::InvalidShareLink(_))
        ));
        assert!(matches!(
            encode("mailto:someone@example.com", &descriptor("x", Permission::View)),
            Err(LibraryError::InvalidInput(_))
        ));
    }

    fn registry_with(records: Vec<ContentRecord>) -> ContentRegistry<StableKvStore<DefaultMemoryImpl>> {
        let mut reg = ContentRegistry::load_or_seed(PersistenceAdapter::new(StableKvStore::init(
            DefaultMemoryImpl::default(),
            1024 * 1024,
        )));
        for r in records {
            reg.add(r).unwrap();
        }
        reg
    }

    fn image(id: &str, expiry: Option<&str>) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            title: "logo.png".to_string(),
            media_type: "png".to_string(),
            size_display: "3 B".to_string(),
            owner: "You".to_string(),
            created_date: "2026-10-01".to_string(),
            tags: vec![],
            folder: "Unsorted".to_string(),
            version: "v1.0".to_string(),
            expiry_date: expiry.map(str::to_string),
            payload: Some("data:image/png;base64,AQID".to_string()),
        }
    }

    #[test]
    fn resolving_a_download_link() {
        let reg = registry_with(vec![image("img", None)]);
        let link = encode(BASE, &descriptor("img", Permission::Download)).unwrap();
        let view = resolve(&reg, &link, "2026-10-17").unwrap();
        assert!(view.can_download);
        assert!(!view.expired);
        assert_eq!(view.preview.as_deref(), Some("data:image/png;base64,AQID"));
        assert_eq!(view.content.id, "img");
    }

    #[test]
    fn view_links_and_seed_records_cannot_download() {
        let reg = registry_with(vec![image("img", None)]);
        let view_only = resolve(&reg, &format!("{BASE}/view/img"), "2026-10-17").unwrap();
        assert!(!view_only.can_download);

        let seed = resolve(&reg, &format!("{BASE}/view/1?permission=download"), "2026-10-17").unwrap();
        assert!(!seed.can_download);
        assert!(!seed.content.has_payload);
        assert_eq!(seed.preview, None);
    }

    #[test]
    fn expired_records_resolve_without_access() {
        let reg = registry_with(vec![image("old", Some("2026-01-31"))]);
        let view = resolve(&reg, &format!("{BASE}/view/old?permission=download"), "2026-10-17").unwrap();
        assert!(view.expired);
        assert!(!view.can_download);
        assert_eq!(view.preview, None);
    }

    #[test]
    fn oversized_images_resolve_without_preview() {
        let mut large = image("large", None);
        large.payload = Some(format!("data:image/png;base64,{}", "A".repeat(MAX_PREVIEW_CHARS)));
        let reg = registry_with(vec![large, image("small", None)]);

        let view = resolve(&reg, &format!("{BASE}/view/large?permission=download"), "2026-10-17").unwrap();
        assert_eq!(view.preview, None);
        assert!(view.can_download);
        assert!(resolve(&reg, &format!("{BASE}/view/small"), "2026-10-17").unwrap().preview.is_some());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let reg = registry_with(vec![]);
        assert_eq!(
            resolve(&reg, &format!("{BASE}/view/deleted"), "2026-10-17"),
            Err(LibraryError::RecordNotFound("deleted".to_string()))
        );
    }
}
