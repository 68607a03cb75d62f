use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1>{"🔬 Kidney Disease Prediction"}</h1>
            <p class="subtitle">{"Upload a CT Scan Image for Analysis"}</p>
        </header>
    }
}
