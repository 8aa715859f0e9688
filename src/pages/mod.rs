use crate::api::ApiClient;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle, Spinner,
};
use crate::hierarchy::{Location, MoveCommand, MoveKind, Scope};
use crate::models::{Category, Item, ItemRef};
use crate::state::AppContext;
use crate::sync::{EditItemsSession, HierarchyEvent};
use icons::X;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params;
use leptos_router::params::Params;

type Session = EditItemsSession<ApiClient>;

const DRAG_MIME: &str = "text/plain";

#[derive(Params, PartialEq, Clone, Debug)]
pub struct EditItemsRouteParams {
    pub path_id: Option<String>,
}

/// Drag payload: `<droppable id>|<index>`.
pub(crate) fn drag_payload(loc: Location) -> String {
    format!("{}|{}", loc.scope, loc.index)
}

pub(crate) fn parse_drag_payload(s: &str) -> Option<Location> {
    let (scope, index) = s.trim().rsplit_once('|')?;
    let scope = scope.parse::<Scope>().ok()?;
    let index = index.parse::<usize>().ok()?;
    Some(Location::new(scope, index))
}

pub(crate) fn is_category_drag(payload: &str) -> bool {
    parse_drag_payload(payload).map(|l| l.scope.kind()) == Some(MoveKind::Category)
}

/// Each reading with the games nested under it, in display order.
pub(crate) fn reading_blocks(items: &[Item]) -> Vec<(Item, Vec<Item>)> {
    items
        .iter()
        .filter(|it| it.is_reading())
        .map(|r| {
            let games = r
                .reading_id
                .map(|rid| items.iter().filter(|g| g.is_game_of(rid)).cloned().collect())
                .unwrap_or_default();
            (r.clone(), games)
        })
        .collect()
}

fn set_drag_data(ev: &web_sys::DragEvent, payload: &str) {
    if let Some(dt) = ev.data_transfer() {
        let _ = dt.set_data(DRAG_MIME, payload);
        dt.set_effect_allowed("move");
    }
}

fn get_drag_data(ev: &web_sys::DragEvent) -> Option<String> {
    ev.data_transfer()
        .and_then(|dt| dt.get_data(DRAG_MIME).ok())
        .filter(|s| !s.trim().is_empty())
}

#[component]
pub fn EditItemsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<EditItemsRouteParams>();

    let path_id = move || {
        params
            .get()
            .ok()
            .and_then(|p| p.path_id)
            .and_then(|s| s.trim().parse::<i64>().ok())
    };

    let categories: RwSignal<Vec<Category>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    // In-flight saves and deletes.
    let busy: RwSignal<usize> = RwSignal::new(0);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let fatal: RwSignal<Option<String>> = RwSignal::new(None);

    // The session holds `Rc`s, so it lives in local (non-Send) storage.
    let session: StoredValue<Option<Session>, LocalStorage> = StoredValue::new_local(None);

    let api_client = app_state.0.api_client;
    let refetch_after_save = app_state.0.config.refetch_after_save;

    // (Re)build the session whenever the route's learning path changes.
    Effect::new(move |_| {
        let Some(id) = path_id() else {
            fatal.set(Some("Missing or invalid learning path id.".to_string()));
            return;
        };

        let s = EditItemsSession::new(
            id,
            api_client.get_untracked(),
            refetch_after_save,
            move |ev| match ev {
                HierarchyEvent::Snapshot {
                    categories: next, ..
                } => categories.set(next),
                HierarchyEvent::Failure(err) if err.is_blocking() => {
                    fatal.set(Some(err.to_string()))
                }
                HierarchyEvent::Failure(err) => notice.set(Some(err.to_string())),
            },
        );
        session.set_value(Some(s.clone()));

        categories.set(vec![]);
        fatal.set(None);
        notice.set(None);
        loading.set(true);

        spawn_local(async move {
            // Failures reach the view through the observer.
            let _ = s.reload().await;
            loading.set(false);
        });
    });

    let on_drop = Callback::new(move |(target, payload): (Location, String)| {
        let Some(source) = parse_drag_payload(&payload) else {
            return;
        };
        let Some(s) = session.get_value() else {
            return;
        };

        notice.set(None);
        let cmd = MoveCommand::from_drag(source, target);
        if let Ok(Some(pending)) = s.begin_move(&cmd) {
            busy.update(|n| *n += 1);
            spawn_local(async move {
                s.persist(pending).await;
                busy.update(|n| *n = n.saturating_sub(1));
            });
        }
    });

    let on_delete = Callback::new(move |item: ItemRef| {
        let Some(s) = session.get_value() else {
            return;
        };

        notice.set(None);
        busy.update(|n| *n += 1);
        spawn_local(async move {
            let _ = s.remove_item(item).await;
            busy.update(|n| *n = n.saturating_sub(1));
        });
    });

    let saving = move || busy.get() > 0;

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4 px-4 py-8">
            <div class="flex items-center justify-between">
                <div>
                    <h1 class="text-lg font-semibold">"Edit Items"</h1>
                    <div class="text-xs text-muted-foreground">
                        "Drag categories, readings and games to reorder them."
                    </div>
                </div>
                <Show when=saving fallback=|| ().into_view()>
                    <div class="inline-flex items-center gap-2 text-xs text-muted-foreground">
                        <Spinner />
                        "Saving..."
                    </div>
                </Show>
            </div>

            {move || {
                notice
                    .get()
                    .map(|msg| {
                        view! {
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">
                                    {msg}
                                </AlertDescription>
                            </Alert>
                        }
                    })
            }}

            {move || {
                if let Some(msg) = fatal.get() {
                    return view! {
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-sm">
                                {msg}
                            </AlertDescription>
                        </Alert>
                    }
                    .into_any();
                }

                let cats = categories.get();
                if cats.is_empty() {
                    if loading.get() {
                        return view! {
                            <div class="flex justify-center py-12">
                                <Spinner class="size-6" />
                            </div>
                        }
                        .into_any();
                    }
                    return view! {
                        <div class="py-8 text-sm text-muted-foreground">
                            "This learning path has no categories yet."
                        </div>
                    }
                    .into_any();
                }

                cats.into_iter()
                    .enumerate()
                    .map(|(index, category)| {
                        view! {
                            <CategoryCard
                                category=category
                                index=index
                                on_drop=on_drop
                                on_delete=on_delete
                            />
                        }
                    })
                    .collect_view()
                    .into_any()
            }}
        </div>
    }
}

#[component]
fn CategoryCard(
    category: Category,
    index: usize,
    on_drop: Callback<(Location, String)>,
    on_delete: Callback<ItemRef>,
) -> impl IntoView {
    let category_id = category.category_id;
    let here = Location::new(Scope::Categories, index);
    let payload = drag_payload(here);

    let blocks = reading_blocks(&category.items);
    let item_count = category.items.len();

    let rows = blocks
        .into_iter()
        .enumerate()
        .map(|(reading_index, (reading, games))| {
            let reading_id = reading.reading_id.unwrap_or_default();
            let reading_row = item_row(
                reading,
                Location::new(Scope::Readings { category_id }, reading_index),
                ItemRef::Reading {
                    category_id,
                    reading_id,
                },
                on_drop,
                on_delete,
            );

            let game_scope = Scope::Games {
                category_id,
                reading_id,
            };
            let game_rows = games
                .into_iter()
                .enumerate()
                .map(|(game_index, g)| {
                    let game_id = g.game_id.unwrap_or_default();
                    item_row(
                        g,
                        Location::new(game_scope, game_index),
                        ItemRef::Game {
                            category_id,
                            game_id,
                        },
                        on_drop,
                        on_delete,
                    )
                })
                .collect_view();

            view! {
                <li class="flex flex-col gap-1">
                    {reading_row}
                    <ul class="ml-6 flex flex-col gap-1">{game_rows}</ul>
                </li>
            }
        })
        .collect_view();

    view! {
        <div
            draggable="true"
            on:dragstart=move |ev: web_sys::DragEvent| set_drag_data(&ev, &payload)
            on:dragover=move |ev: web_sys::DragEvent| ev.prevent_default()
            on:drop=move |ev: web_sys::DragEvent| {
                let Some(p) = get_drag_data(&ev) else {
                    return;
                };
                ev.prevent_default();
                ev.stop_propagation();
                // Items dropped between rows are not category moves.
                if is_category_drag(&p) {
                    on_drop.run((here, p));
                }
            }
        >
            <Card class="gap-3 py-4">
                <CardHeader class="px-4">
                    <CardTitle class="text-sm">{category.category_name.clone()}</CardTitle>
                    <CardDescription class="text-xs">
                        {format!("{item_count} items")}
                    </CardDescription>
                </CardHeader>
                <CardContent class="px-4">
                    <ul class="flex flex-col gap-2">{rows}</ul>
                </CardContent>
            </Card>
        </div>
    }
}

fn item_row(
    item: Item,
    here: Location,
    target: ItemRef,
    on_drop: Callback<(Location, String)>,
    on_delete: Callback<ItemRef>,
) -> impl IntoView {
    let payload = drag_payload(here);
    let row_class = if item.is_reading() {
        "flex items-center gap-2 rounded-md border px-2 py-1 cursor-grab"
    } else {
        "flex items-center gap-2 rounded-md border border-dashed px-2 py-1 cursor-grab"
    };
    let inactive = !item.is_active;

    view! {
        <div
            class=row_class
            draggable="true"
            on:dragstart=move |ev: web_sys::DragEvent| {
                // Keep the enclosing category from overwriting the payload.
                ev.stop_propagation();
                set_drag_data(&ev, &payload);
            }
            on:dragover=move |ev: web_sys::DragEvent| ev.prevent_default()
            on:drop=move |ev: web_sys::DragEvent| {
                let Some(p) = get_drag_data(&ev) else {
                    return;
                };
                // Category drags bubble up to the card.
                if is_category_drag(&p) {
                    return;
                }
                ev.prevent_default();
                ev.stop_propagation();
                on_drop.run((here, p));
            }
        >
            <span class="w-6 text-right text-xs tabular-nums text-muted-foreground">
                {item.sequence_order}
            </span>
            <span class="min-w-0 flex-1 truncate text-sm">{item.name}</span>
            <Show when=move || inactive fallback=|| ().into_view()>
                <span class="text-xs text-muted-foreground">"inactive"</span>
            </Show>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Icon
                class="h-7 w-7 text-destructive"
                attr:title="Delete"
                on:click=move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    on_delete.run(target);
                }
            >
                <X class="size-4" />
            </Button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::fixtures::{game, reading};

    #[test]
    fn test_drag_payload_roundtrip() {
        let loc = Location::new(
            Scope::Games {
                category_id: 3,
                reading_id: 8,
            },
            2,
        );
        assert_eq!(drag_payload(loc), "games-3-8|2");
        assert_eq!(parse_drag_payload(&drag_payload(loc)), Some(loc));
    }

    #[test]
    fn test_parse_drag_payload_rejects_garbage() {
        assert!(parse_drag_payload("").is_none());
        assert!(parse_drag_payload("categories").is_none());
        assert!(parse_drag_payload("categories|x").is_none());
        assert!(parse_drag_payload("shelves-1|0").is_none());
    }

    #[test]
    fn test_only_category_payloads_count_as_category_drags() {
        assert!(is_category_drag("categories|1"));
        assert!(!is_category_drag("readings-4|0"));
        assert!(!is_category_drag("games-4-2|1"));
        assert!(!is_category_drag("not a payload"));
    }

    #[test]
    fn test_reading_blocks_pair_games_with_readings() {
        let items = vec![
            reading(1, 10, 1),
            game(2, 100, 10, 2),
            reading(3, 20, 3),
            game(4, 101, 20, 4),
            game(5, 102, 20, 5),
        ];
        let blocks = reading_blocks(&items);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].1.len(), 1);
        assert_eq!(blocks[1].1.len(), 2);
        assert_eq!(blocks[1].0.reading_id, Some(20));
    }
}
