use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, first_accepted_file};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let disabled = model.phase.is_processing();

    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let selected = input
            .files()
            .ok_or_else(|| "No file selected.".to_string())
            .and_then(|files| first_accepted_file(&files));

        input.set_value("");

        match selected {
            Ok(file) => Msg::FileSelected(file),
            Err(message) => Msg::SetNotice(Some(message)),
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        if let Some(input) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("file-input"))
        {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <div class="upload-section">
            <input
                type="file"
                id="file-input"
                accept=".png,.jpg,.jpeg,image/png,image/jpeg"
                style="display: none;"
                onchange={handle_change}
                disabled={disabled}
            />

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Upload a CT Scan Image: drag & drop, paste, or click"}</p>
                    <p class="file-types">{"Supported formats: PNG, JPG, JPEG"}</p>
                </div>
            </div>
        </div>
    }
}
