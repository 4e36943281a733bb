use crate::card::CardRenderer;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) renderer: CardRenderer,
}
