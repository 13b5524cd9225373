use std::sync::Arc;

use dioxus::prelude::*;
use nosmoke_core::{Config, DomainState, DomainStore, SessionState, SessionStore};
use tokio::sync::watch;
use tracing::warn;

use crate::ui::{
	about::About,
	admin::Admin,
	database::Database,
	history::History,
	home::Home,
	live_detection::LiveDetection,
	navbar::Navbar,
	notification::{NotificationLayer, NotificationService, NotificationServiceStoreImplExt},
};

const MAIN_CSS: Asset = asset!("/assets/main.css");

/// Shared handles, provided as root context.
#[derive(Clone)]
pub struct Services {
	pub config: Arc<Config>,
	pub session: SessionStore,
	pub domain: DomainStore,
}

#[derive(Clone)]
pub struct StartupError(pub String);

#[derive(Routable, Clone, PartialEq, Debug)]
#[rustfmt::skip]
pub enum Route {
	#[layout(Shell)]
		#[route("/")]
		Home {},
		#[route("/admin")]
		Admin {},
		#[route("/about")]
		About {},
		#[layout(Protected)]
			#[route("/database")]
			Database {},
			#[route("/history")]
			History {},
			#[route("/live-detection")]
			LiveDetection {},
		#[end_layout]
		#[route("/:..segments")]
		NotFound { segments: Vec<String> },
}

#[component]
pub fn StartupErrorApp() -> Element {
	let err = use_context::<StartupError>();

	rsx! {
		document::Stylesheet { href: MAIN_CSS }
		div { class: "app",
			div { class: "header",
				h1 { "NoSmoke" }
			}
			div { class: "startup-error-banner", "Cannot start: {err.0}" }
		}
	}
}

/// Mirror a watch channel into a signal owned by the calling scope.
pub fn use_watch<T: Clone + 'static>(rx: impl FnOnce() -> watch::Receiver<T>) -> Signal<T> {
	let mut rx = use_hook(rx);
	let mut state = use_signal(|| rx.borrow().clone());
	use_hook(move || {
		spawn(async move {
			while rx.changed().await.is_ok() {
				let next = rx.borrow_and_update().clone();
				state.set(next);
			}
		})
	});
	state
}

#[component]
pub fn App() -> Element {
	let services = use_context::<Services>();
	let notifs = use_store(NotificationService::new);
	use_context_provider(|| notifs);

	let session_store = services.session.clone();
	let session = use_watch(move || session_store.subscribe());
	use_context_provider(|| session);

	let domain_store = services.domain.clone();
	let domain = use_watch(move || domain_store.subscribe());
	use_context_provider(|| domain);

	// Restore the saved session, then pull roster and history once.
	let startup = services.clone();
	use_hook(move || {
		let mut notifs = notifs;
		spawn(async move {
			startup.session.restore();
			if let Err(e) = startup.domain.load().await {
				warn!(error = %e, "initial load failed");
				notifs.warn(format!("Could not load data from the backend: {e}"));
			}
		});
	});

	rsx! {
		document::Stylesheet { href: MAIN_CSS }
		Router::<Route> {}
	}
}

#[component]
fn Shell() -> Element {
	let notifs = use_context::<Store<NotificationService>>();

	rsx! {
		div { class: "app",
			Navbar {}
			main { class: "page",
				Outlet::<Route> {}
			}
			NotificationLayer { notifs }
		}
	}
}

/// Pages that need a signed-in operator.
#[component]
fn Protected() -> Element {
	let session = use_context::<Signal<SessionState>>();
	let nav = use_navigator();

	use_effect(move || {
		let state = session();
		if !state.restoring && !state.is_signed_in() {
			nav.replace(Route::Admin {});
		}
	});

	let state = session();
	if state.restoring || !state.is_signed_in() {
		return rsx! {
			div { class: "loading", "Loading..." }
		};
	}
	rsx! { Outlet::<Route> {} }
}

#[component]
fn NotFound(segments: Vec<String>) -> Element {
	let path = segments.join("/");
	rsx! {
		div { class: "empty",
			h2 { "Page not found" }
			p { "Nothing lives at /{path}." }
			Link { to: Route::Home {}, class: "btn-primary", "Back to dashboard" }
		}
	}
}

/// Current roster and detection log, as mirrored by [`App`].
pub fn use_domain() -> Signal<DomainState> {
	use_context::<Signal<DomainState>>()
}

pub fn use_session() -> Signal<SessionState> {
	use_context::<Signal<SessionState>>()
}

pub fn use_services() -> Services {
	use_context::<Services>()
}
