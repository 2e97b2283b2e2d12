use std::sync::Arc;

use anyhow::Context;
use log::debug;

use crate::page::Page;

// The host creates media elements detached from the tree for background
// decoding; hiding them and appending them to the body puts them where the
// structural observer can see them. Installed once at startup, never torn down.
pub fn install_media_capture(page: &Arc<Page>) -> anyhow::Result<()> {
    page.install_creation_hook(Arc::new(|page, element| {
        if !element.is_media() {
            return;
        }
        debug!("Capturing a detached {} element", element.tag());
        element.set_hidden(true);
        page.append_child(page.body(), element);
    }))
    .context("Failed to install the media capture hook")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_hide_and_attach_created_media_elements() {
        // given
        let page = Page::new();
        install_media_capture(&page).unwrap();

        // when
        let video = page.create_element("video");
        let audio = page.create_element("audio");

        // then
        assert!(video.hidden());
        assert!(audio.hidden());
        assert_eq!(page.media_elements().len(), 2);
        assert!(Arc::ptr_eq(&video.parent().unwrap(), page.body()));
    }

    #[test]
    fn should_leave_other_elements_untouched() {
        // given
        let page = Page::new();
        install_media_capture(&page).unwrap();

        // when
        let div = page.create_element("div");

        // then
        assert!(!div.hidden());
        assert!(div.parent().is_none());
    }

    #[test]
    fn should_fail_when_a_hook_is_already_installed() {
        // given
        let page = Page::new();
        install_media_capture(&page).unwrap();

        // when
        let result = install_media_capture(&page);

        // then
        assert!(result.is_err());
    }
}
