use super::super::{FileData, Model, Msg};
use super::utils::first_accepted_file;
use crate::api::request_prediction;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_timers::future::TimeoutFuture;
use js_sys::Date;
use shared::InferenceResponse;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

/// Minimum time the spinner stays up, so fast answers do not flash.
const MIN_SPINNER_MS: f64 = 1500.0;

pub fn handle_file_selected(model: &mut Model, file: GlooFile) -> bool {
    if model.phase.is_processing() {
        model.notice = Some("Please wait for the current prediction to finish.".into());
        return true;
    }

    let preview_url = ObjectUrl::from(file.clone());
    model.file = Some(FileData { file, preview_url });
    model.phase.reset();
    model.notice = None;
    true
}

pub fn handle_remove_file(model: &mut Model) -> bool {
    if model.phase.is_processing() {
        return false;
    }

    model.file = None;
    model.phase.reset();
    model.notice = None;
    true
}

pub fn handle_predict(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(file_data) = &model.file else {
        model.notice = Some("Upload a CT scan image first.".into());
        return true;
    };

    if !model.phase.start() {
        return false;
    }

    model.notice = None;
    send_prediction_request(ctx, file_data.file.clone());
    true
}

pub fn handle_prediction_ready(model: &mut Model, response: InferenceResponse) -> bool {
    log::info!(
        "Prediction {} finished in {} ms",
        response.request_id,
        response.elapsed_ms
    );
    model.phase.complete(response)
}

pub fn handle_prediction_failed(model: &mut Model, message: String) -> bool {
    gloo_console::error!(format!("Prediction failed: {}", message));
    model.phase.fail(message)
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
        process_file_list(ctx, file_list);
    }

    true
}

pub fn handle_paste(_model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(file_list) = event.clipboard_data().and_then(|dt| dt.files()) {
        if file_list.length() > 0 {
            event.prevent_default();
            process_file_list(ctx, file_list);
            return true;
        }
    }
    false
}

pub fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    match first_accepted_file(&file_list) {
        Ok(file) => ctx.link().send_message(Msg::FileSelected(file)),
        Err(message) => {
            log::warn!("{}", message);
            ctx.link().send_message(Msg::SetNotice(Some(message)));
        }
    }
}

pub fn send_prediction_request(ctx: &Context<Model>, file: GlooFile) {
    let link = ctx.link().clone();

    spawn_local(async move {
        let started = Date::now();
        let result = request_prediction(&file).await;

        let remaining = MIN_SPINNER_MS - (Date::now() - started);
        if remaining > 0.0 {
            TimeoutFuture::new(remaining as u32).await;
        }

        match result {
            Ok(response) => link.send_message(Msg::PredictionReady(response)),
            Err(message) => link.send_message(Msg::PredictionFailed(message)),
        }
    });
}
