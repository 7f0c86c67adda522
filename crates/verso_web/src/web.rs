use leptos::prelude::*;
use tracing::{info, warn};
use verso::config::{
    ParamRange, CROSSOVER_RATE, ELITISM_COUNT, MUTATION_RATE, POPULATION_SIZE, TARGET_PRESETS,
};
use verso::prelude::*;

use crate::ui_model::{
    can_start, can_stop, format_percent, gene_matches, phase_badge, StartForm,
};

mod charts;
mod runtime;
mod storage;

use runtime::WasmRuntime;

type Controller = SessionController<HttpGaClient, WasmRuntime>;

pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    mount_to_body(|| view! { <App /> });
}

#[component]
fn App() -> impl IntoView {
    let api_url = storage::api_url();
    info!("GA service at {api_url}");

    let controller: StoredValue<Controller, LocalStorage> = StoredValue::new_local(
        SessionController::new(
            HttpGaClient::new(api_url.clone()),
            WasmRuntime,
            ControllerOptions::default(),
        ),
    );

    let (state, set_state) = signal(SessionState::default());
    controller.with_value(|c| c.subscribe(move |s| set_state.set(s.clone())));

    let target = RwSignal::new(TARGET_PRESETS[0].to_string());
    let population_size = RwSignal::new(String::new());
    let mutation_rate = RwSignal::new(String::new());
    let crossover_rate = RwSignal::new(String::new());
    let elitism_count = RwSignal::new(String::new());
    let (form_error, set_form_error) = signal::<Option<String>>(None);

    let api_url_input = RwSignal::new(api_url);
    let (api_status, set_api_status) = signal(String::new());

    // Surface an unreachable service before the first Start.
    {
        let c = controller.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = c.check_health().await;
        });
    }

    let do_start = move || {
        let form = StartForm {
            target: target.get_untracked(),
            population_size: population_size.get_untracked(),
            mutation_rate: mutation_rate.get_untracked(),
            crossover_rate: crossover_rate.get_untracked(),
            elitism_count: elitism_count.get_untracked(),
        };
        let config = match form.to_config() {
            Ok(config) => config,
            Err(e) => {
                set_form_error.set(Some(e));
                return;
            }
        };
        set_form_error.set(None);

        let c = controller.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = c.start(&form.target, config).await {
                warn!("start failed: {e}");
            }
        });
    };

    let do_stop = move || controller.with_value(|c| c.stop());

    let do_reset = move || {
        let c = controller.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = c.reset().await {
                warn!("reset failed: {e}");
            }
        });
    };

    let do_save_api_url = move || match storage::save_api_url(&api_url_input.get_untracked()) {
        Ok(Some(url)) => set_api_status.set(format!("saved {url}; reload to apply")),
        Ok(None) => set_api_status.set("override cleared; reload to apply".to_string()),
        Err(e) => set_api_status.set(e),
    };

    // Redraw only when the plotted data changes, not on every state commit.
    let chart_data = Memo::new(move |_| state.with(|s| (s.history.clone(), s.generation)));
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    Effect::new(move |_| {
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        chart_data.with(|(history, generation)| {
            if let Err(e) = charts::draw_fitness_history(&canvas, history, *generation) {
                warn!("chart draw failed: {e}");
            }
        });
    });

    let phase = move || state.with(|s| s.phase);

    view! {
        <main style="font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; padding: 18px; max-width: 880px; margin: 0 auto; color: #e8ecff; background: #0a0f1a;">
            <header style="display: flex; align-items: center; gap: 12px; margin-bottom: 12px;">
                <h1 style="margin: 0;">"verso"</h1>
                {move || {
                    let (label, color) = phase_badge(phase());
                    view! {
                        <span style=format!("padding: 2px 10px; border-radius: 999px; border: 1px solid {color}; color: {color};")>
                            {label}
                        </span>
                    }
                }}
            </header>
            <p style="margin: 0 0 16px 0; color: #94a3b8;">
                "Evolving strings toward a target phrase on a remote genetic algorithm."
            </p>

            {move || state.with(|s| s.error.clone()).map(|e| view! {
                <div style="padding: 8px 12px; margin-bottom: 12px; border-radius: 6px; background: rgba(251, 113, 133, 0.15); color: #fb7185;">
                    {e}
                </div>
            })}

            <section style="display: flex; gap: 10px; flex-wrap: wrap; margin-bottom: 14px; align-items: center;">
                <label>
                    "Target "
                    <input
                        type="text"
                        style="width: 320px; text-transform: uppercase;"
                        prop:value=move || target.get()
                        on:input=move |ev| target.set(event_target_value(&ev))
                    />
                </label>
                <select on:change=move |ev| {
                    let v = event_target_value(&ev);
                    if !v.is_empty() {
                        target.set(v);
                    }
                }>
                    <option value="">"Presets…"</option>
                    {TARGET_PRESETS
                        .iter()
                        .map(|p| view! { <option value=*p>{*p}</option> })
                        .collect_view()}
                </select>
            </section>

            <section style="display: flex; gap: 14px; flex-wrap: wrap; margin-bottom: 14px;">
                <ParamInput range=POPULATION_SIZE value=population_size />
                <ParamInput range=MUTATION_RATE value=mutation_rate />
                <ParamInput range=CROSSOVER_RATE value=crossover_rate />
                <ParamInput range=ELITISM_COUNT value=elitism_count />
            </section>

            {move || form_error.get().map(|e| view! {
                <p style="color: #fbbf24; margin: 0 0 12px 0;">{e}</p>
            })}

            <section style="display: flex; gap: 10px; flex-wrap: wrap; margin-bottom: 14px;">
                <button
                    disabled=move || !can_start(phase(), &target.get())
                    on:click=move |_| do_start()
                >
                    "Start"
                </button>
                <button disabled=move || !can_stop(phase()) on:click=move |_| do_stop()>
                    "Stop"
                </button>
                <button on:click=move |_| do_reset()>
                    "Reset"
                </button>
            </section>

            <section style="display: flex; gap: 24px; flex-wrap: wrap; margin-bottom: 14px;">
                <div>"Generation: " <strong>{move || state.with(|s| s.generation)}</strong></div>
                <div>"Best: " <strong>{move || state.with(|s| format_percent(s.best_fitness()))}</strong></div>
                <div>"Average: " <strong>{move || state.with(|s| format_percent(s.average_fitness))}</strong></div>
            </section>

            {move || state.with(|s| s.best_ever.clone().map(|b| {
                let target = s.target.clone();
                view! {
                    <div style="font-family: ui-monospace, monospace; font-size: 20px; margin-bottom: 14px;">
                        <Genes genes=b.genes target=target />
                    </div>
                }
            }))}

            <canvas
                node_ref=canvas_ref
                width="800"
                height="400"
                style="width: 100%; max-width: 800px; border-radius: 8px;"
            ></canvas>

            <section style="margin-top: 14px;">
                <h3 style="margin: 0 0 8px 0;">"Top individuals"</h3>
                <ol style="font-family: ui-monospace, monospace; margin: 0; padding-left: 28px;">
                    {move || state.with(|s| {
                        s.population
                            .iter()
                            .map(|ind| {
                                let genes = ind.genes.clone();
                                let target = s.target.clone();
                                let fitness = format_percent(ind.fitness);
                                view! {
                                    <li>
                                        <Genes genes=genes target=target />
                                        <span style="color: #94a3b8; margin-left: 12px;">{fitness}</span>
                                    </li>
                                }
                            })
                            .collect_view()
                    })}
                </ol>
            </section>

            <section style="margin-top: 18px; display: flex; gap: 10px; align-items: center; flex-wrap: wrap;">
                <label>
                    "GA service "
                    <input
                        type="text"
                        style="width: 260px;"
                        prop:value=move || api_url_input.get()
                        on:input=move |ev| api_url_input.set(event_target_value(&ev))
                    />
                </label>
                <button on:click=move |_| do_save_api_url()>"Save"</button>
                <span style="color: #94a3b8;">{move || api_status.get()}</span>
            </section>
        </main>
    }
}

#[component]
fn ParamInput(range: ParamRange, value: RwSignal<String>) -> impl IntoView {
    view! {
        <label style="display: flex; flex-direction: column; gap: 4px;">
            <span style="color: #94a3b8; font-size: 12px;">{range.label}</span>
            <input
                type="number"
                style="width: 120px;"
                min=range.min.to_string()
                max=range.max.to_string()
                step=range.step.to_string()
                placeholder=range.service_default.to_string()
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))
            />
        </label>
    }
}

/// Genes with the characters that already match the target highlighted.
#[component]
fn Genes(genes: String, target: String) -> impl IntoView {
    gene_matches(&genes, &target)
        .into_iter()
        .map(|(c, hit)| {
            let color = if hit { "#4ade80" } else { "#e8ecff" };
            view! { <span style=format!("color: {color};")>{c.to_string()}</span> }
        })
        .collect_view()
}
