use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use shared::is_accepted_upload;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || {
            inner_callback();
        }));
    })
}

/// Only one scan is analysed at a time; extra files are ignored.
pub fn first_accepted_file(file_list: &FileList) -> Result<GlooFile, String> {
    let mut skipped = Vec::new();

    for i in 0..file_list.length() {
        if let Some(file) = file_list.item(i) {
            if is_accepted_upload(&file.name(), &file.type_()) {
                return Ok(GlooFile::from(file));
            }
            skipped.push(file.name());
        }
    }

    if skipped.is_empty() {
        Err("No file selected.".to_string())
    } else {
        Err(format!(
            "Unsupported file: {}. Supported formats: PNG, JPG, JPEG",
            skipped.join(", ")
        ))
    }
}

pub fn render_error_message(model: &Model) -> Html {
    let message = model.notice.as_deref().or_else(|| model.phase.error());

    if let Some(error_msg) = message {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}
