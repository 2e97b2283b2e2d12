use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
};

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::utils::same_rate;

pub type ElementRef = Arc<Element>;
pub type MediaListener = Arc<dyn Fn(&Element, MediaEvent) + Send + Sync>;
pub type ClickListener = Arc<dyn Fn(&ClickEvent) + Send + Sync>;
pub type ChildListObserver = Arc<dyn Fn(&ChildListMutation) + Send + Sync>;
pub type CreationHook = Arc<dyn Fn(&Page, &ElementRef) + Send + Sync>;

const MEDIA_TAGS: [&str; 2] = ["audio", "video"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    RateChange,
    Playing,
}

pub struct ClickEvent {
    target: ElementRef,
    stopped: AtomicBool,
}

impl ClickEvent {
    fn new(target: ElementRef) -> Self {
        Self {
            target,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub fn stop_propagation(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

pub struct ChildListMutation {
    pub added: Vec<ElementRef>,
    pub removed: Vec<ElementRef>,
}

impl ChildListMutation {
    fn added(element: &ElementRef) -> Self {
        Self {
            added: vec![Arc::clone(element)],
            removed: vec![],
        }
    }

    fn removed(element: &ElementRef) -> Self {
        Self {
            added: vec![],
            removed: vec![Arc::clone(element)],
        }
    }
}

struct ElementState {
    parent: Weak<Element>,
    children: Vec<ElementRef>,
    attributes: HashMap<String, String>,
    text: String,
    hidden: bool,
    playback_rate: f64,
    monitored: bool,
    media_listeners: Vec<MediaListener>,
    click_listeners: Vec<ClickListener>,
}

pub struct Element {
    tag: String,
    state: Mutex<ElementState>,
}

impl Element {
    fn new(tag: &str) -> ElementRef {
        Arc::new(Self {
            tag: tag.to_string(),
            state: Mutex::new(ElementState {
                parent: Weak::new(),
                children: Vec::new(),
                attributes: HashMap::new(),
                text: String::new(),
                hidden: false,
                playback_rate: 1.0,
                monitored: false,
                media_listeners: Vec::new(),
                click_listeners: Vec::new(),
            }),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_media(&self) -> bool {
        MEDIA_TAGS.contains(&self.tag.as_str())
    }

    pub fn parent(&self) -> Option<ElementRef> {
        self.state.lock().parent.upgrade()
    }

    pub fn children(&self) -> Vec<ElementRef> {
        self.state.lock().children.clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.state.lock().attributes.get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.state
            .lock()
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    pub fn set_text(&self, text: &str) {
        self.state.lock().text = text.to_string();
    }

    pub fn hidden(&self) -> bool {
        self.state.lock().hidden
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }

    pub fn playback_rate(&self) -> f64 {
        self.state.lock().playback_rate
    }

    // An unchanged rate dispatches nothing, which bounds enforcement recursion.
    pub fn set_playback_rate(&self, rate: f64) {
        let listeners = {
            let mut state = self.state.lock();
            if same_rate(state.playback_rate, rate) {
                return;
            }
            state.playback_rate = rate;
            state.media_listeners.clone()
        };
        for listener in &listeners {
            listener(self, MediaEvent::RateChange);
        }
    }

    pub fn emit_playing(&self) {
        let listeners = self.state.lock().media_listeners.clone();
        for listener in &listeners {
            listener(self, MediaEvent::Playing);
        }
    }

    pub fn add_media_listener(&self, listener: MediaListener) {
        self.state.lock().media_listeners.push(listener);
    }

    #[cfg(test)]
    pub(crate) fn media_listener_count(&self) -> usize {
        self.state.lock().media_listeners.len()
    }

    pub fn add_click_listener(&self, listener: ClickListener) {
        self.state.lock().click_listeners.push(listener);
    }

    // Returns whether the element was already marked.
    pub(crate) fn mark_monitored(&self) -> bool {
        let mut state = self.state.lock();
        std::mem::replace(&mut state.monitored, true)
    }

    pub fn contains(&self, node: &ElementRef) -> bool {
        let mut current = Arc::clone(node);
        loop {
            if std::ptr::eq(Arc::as_ptr(&current), self as *const Element) {
                return true;
            }
            let Some(parent) = current.parent() else {
                return false;
            };
            current = parent;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

enum InsertPosition {
    First,
    Last,
}

pub struct Page {
    body: ElementRef,
    creation_hook: Mutex<Option<CreationHook>>,
    child_observers: Mutex<Vec<ChildListObserver>>,
    click_listeners: Mutex<Vec<(ListenerId, ClickListener)>>,
    next_listener_id: AtomicU64,
}

impl Page {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            body: Element::new("body"),
            creation_hook: Mutex::new(None),
            child_observers: Mutex::new(Vec::new()),
            click_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        })
    }

    pub fn body(&self) -> &ElementRef {
        &self.body
    }

    // All element creation funnels through here so the installed hook sees
    // every new element, attached or not.
    pub fn create_element(&self, tag: &str) -> ElementRef {
        let element = Element::new(tag);
        let hook = self.creation_hook.lock().clone();
        if let Some(hook) = hook {
            hook(self, &element);
        }
        element
    }

    pub fn install_creation_hook(&self, hook: CreationHook) -> anyhow::Result<()> {
        let mut slot = self.creation_hook.lock();
        if slot.is_some() {
            return Err(anyhow!("An element creation hook is already installed"));
        }
        *slot = Some(hook);
        Ok(())
    }

    pub fn append_child(&self, parent: &ElementRef, child: &ElementRef) {
        self.insert_child(parent, child, InsertPosition::Last);
    }

    pub fn prepend_child(&self, parent: &ElementRef, child: &ElementRef) {
        self.insert_child(parent, child, InsertPosition::First);
    }

    fn insert_child(&self, parent: &ElementRef, child: &ElementRef, position: InsertPosition) {
        detach(child);
        {
            let mut parent_state = parent.state.lock();
            match position {
                InsertPosition::First => parent_state.children.insert(0, Arc::clone(child)),
                InsertPosition::Last => parent_state.children.push(Arc::clone(child)),
            }
        }
        child.state.lock().parent = Arc::downgrade(parent);
        if Arc::ptr_eq(parent, &self.body) {
            self.notify_child_list(&ChildListMutation::added(child));
        }
    }

    pub fn remove(&self, element: &ElementRef) {
        let Some(parent) = detach(element) else {
            return;
        };
        if Arc::ptr_eq(&parent, &self.body) {
            self.notify_child_list(&ChildListMutation::removed(element));
        }
    }

    // Observers see direct-child changes of the body only.
    pub fn observe_children(&self, observer: ChildListObserver) {
        self.child_observers.lock().push(observer);
    }

    fn notify_child_list(&self, mutation: &ChildListMutation) {
        let observers = self.child_observers.lock().clone();
        for observer in &observers {
            observer(mutation);
        }
    }

    pub fn add_click_listener(&self, listener: ClickListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.click_listeners.lock().push((id, listener));
        id
    }

    pub fn remove_click_listener(&self, id: ListenerId) {
        self.click_listeners
            .lock()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    // The document list is snapshotted after the element phase, so a listener
    // removed during that phase is not invoked.
    pub fn click(&self, target: &ElementRef) {
        let event = ClickEvent::new(Arc::clone(target));
        let element_listeners = target.state.lock().click_listeners.clone();
        for listener in &element_listeners {
            listener(&event);
        }
        if event.propagation_stopped() {
            return;
        }
        let document_listeners: Vec<ClickListener> = self
            .click_listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &document_listeners {
            listener(&event);
        }
    }

    // Depth-first from the body; detached elements are not found.
    pub fn find(&self, predicate: impl Fn(&ElementRef) -> bool) -> Option<ElementRef> {
        find_in(&self.body, &predicate)
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<ElementRef> {
        self.find(|element| element.tag() == tag)
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<ElementRef> {
        self.find(|element| element.attr(name).as_deref() == Some(value))
    }

    pub fn media_elements(&self) -> Vec<ElementRef> {
        let mut found = Vec::new();
        collect_media(&self.body, &mut found);
        found
    }
}

fn detach(element: &ElementRef) -> Option<ElementRef> {
    let parent = element.parent()?;
    parent
        .state
        .lock()
        .children
        .retain(|child| !Arc::ptr_eq(child, element));
    element.state.lock().parent = Weak::new();
    Some(parent)
}

fn find_in(element: &ElementRef, predicate: &impl Fn(&ElementRef) -> bool) -> Option<ElementRef> {
    if predicate(element) {
        return Some(Arc::clone(element));
    }
    for child in element.children() {
        if let Some(found) = find_in(&child, predicate) {
            return Some(found);
        }
    }
    None
}

fn collect_media(element: &ElementRef, found: &mut Vec<ElementRef>) {
    if element.is_media() {
        found.push(Arc::clone(element));
    }
    for child in element.children() {
        collect_media(&child, found);
    }
}
