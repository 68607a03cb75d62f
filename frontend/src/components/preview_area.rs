use super::super::{Model, Msg};
use super::utils::debounce;
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(file_data) = &model.file else {
        return html! {};
    };

    let link = ctx.link().clone();
    let processing = model.phase.is_processing();

    html! {
        <div id="preview-container">
            <img id="actual-image-preview"
                src={file_data.preview_url.to_string()}
                alt="Uploaded Image" />
            <p class="preview-caption">{ format!("Uploaded Image: {}", file_data.file.name()) }</p>

            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn secondary"
                    disabled={processing}
                    onclick={link.callback(|_| Msg::RemoveFile)}
                >
                    <i class="fa-solid fa-trash"></i>{" Remove"}
                </button>
                <button
                    id="predict-btn"
                    class="analyze-btn"
                    disabled={processing}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Predict)
                    })}
                >
                    { render_predict_button_content(processing) }
                </button>
            </div>
        </div>
    }
}

fn render_predict_button_content(processing: bool) -> Html {
    if processing {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Processing Image... Please wait."}</> }
    } else {
        html! { <>{"🧪 Predict Now"}</> }
    }
}
