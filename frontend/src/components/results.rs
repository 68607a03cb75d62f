use super::super::Model;
use shared::{format_percent, ClassLabel, ModelOutcome, PredictionResult};
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    let Some(response) = model.phase.response() else {
        return html! {};
    };

    html! {
        <div class="results-container">
            <hr />
            <h2>{"🧠 Prediction Results"}</h2>
            <div class="result-columns">
                { for response.outcomes.iter().map(render_outcome) }
            </div>
            <p class="result-meta">
                { format!("{}x{} input, {} ms", response.width, response.height, response.elapsed_ms) }
            </p>
            <hr />
        </div>
    }
}

fn render_outcome(outcome: &ModelOutcome) -> Html {
    html! {
        <div class="result-column">
            <div class="prediction-header">{ format!("🔍 {} Prediction", outcome.model) }</div>
            {
                match (&outcome.prediction, &outcome.error) {
                    (Some(prediction), _) => render_prediction(prediction),
                    (None, Some(error)) => html! {
                        <div class="result-box failed">
                            <h3>{"Unavailable"}</h3>
                            <p>{ error }</p>
                        </div>
                    },
                    (None, None) => html! {},
                }
            }
        </div>
    }
}

fn render_prediction(prediction: &PredictionResult) -> Html {
    html! {
        <div class="result-box">
            <h3>{ prediction.label.to_string() }</h3>
            <p>{ format!("Confidence: {}", format_percent(prediction.confidence)) }</p>
            <div class="result-bars">
                { for ClassLabel::all().into_iter().zip(prediction.probabilities.iter()).map(|(label, &p)| {
                    html! {
                        <div class={classes!("result-item", (label == prediction.label).then_some("top"))}>
                            <div class="result-label">{ label.to_string() }</div>
                            <div class="result-bar-container">
                                <div class="result-bar" style={format!("width: {}%", p * 100.0)}></div>
                            </div>
                            <div class="result-value">{ format_percent(p) }</div>
                        </div>
                    }
                })}
            </div>
        </div>
    }
}
