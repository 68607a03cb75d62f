mod api;
mod components;

use components::{handlers, header, preview_area, results, upload_section, utils};
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::{InferenceResponse, RequestPhase};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub struct FileData {
    pub file: GlooFile,
    pub preview_url: ObjectUrl,
}

pub enum Msg {
    // File operations
    FileSelected(GlooFile),
    RemoveFile,

    // Prediction
    Predict,
    PredictionReady(InferenceResponse),
    PredictionFailed(String),

    // UI states
    SetNotice(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    pub file: Option<FileData>,
    pub phase: RequestPhase,
    /// Problems with the chosen file itself, before any request is made.
    pub notice: Option<String>,
    pub is_dragging: bool,
    _paste_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        Self {
            file: None,
            phase: RequestPhase::Idle,
            notice: None,
            is_dragging: false,
            _paste_listener: paste_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, file),
            Msg::RemoveFile => handlers::handle_remove_file(self),

            Msg::Predict => handlers::handle_predict(self, ctx),
            Msg::PredictionReady(response) => handlers::handle_prediction_ready(self, response),
            Msg::PredictionFailed(message) => handlers::handle_prediction_failed(self, message),

            Msg::SetNotice(notice) => {
                self.notice = notice;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { header::render_header() }

                <main class="main-content">
                    { upload_section::render_upload_section(self, ctx) }
                    { utils::render_error_message(self) }
                    { preview_area::render_preview_area(self, ctx) }
                    { results::render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Kidney CT Classifier | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
