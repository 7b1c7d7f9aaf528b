use iocraft::prelude::*;
use tokio::sync::watch;

#[derive(Default, Props)]
pub struct ProgressBarProps {
    pub title: String,
    pub progress: Option<watch::Receiver<f32>>,
}

#[component]
pub fn ProgressBar(props: &ProgressBarProps, mut hooks: Hooks) -> impl Into<AnyElement<'static>> {
    let mut percent = hooks.use_state(|| 0.0f32);
    let receiver = props.progress.clone();

    hooks.use_future(async move {
        let Some(mut receiver) = receiver else {
            return;
        };
        while receiver.changed().await.is_ok() {
            let value = *receiver.borrow_and_update();
            percent.set(value.clamp(0.0, 100.0));
        }
    });

    element! {
        View(flex_direction: FlexDirection::Column) {
            Text(weight: Weight::Bold, content: props.title.clone())
            View(flex_direction: FlexDirection::Row) {
                View(border_style: BorderStyle::Round, border_color: Color::Blue, width: 52) {
                    View(width: Percent(percent.get()), height: 1, background_color: Color::Green)
                }
                Text(content: format!(" {:>3.0}%", percent.get()))
            }
        }
    }
}

#[derive(Default, Props)]
pub struct MessageProps {
    pub message: String,
}

#[component]
pub fn SuccessMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Green, content: "◆ ")
            Text(content: props.message.clone())
        }
    }
}

#[component]
pub fn ErrorMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Red, content: "▲ ")
            Text(color: Color::Red, content: props.message.clone())
        }
    }
}

#[derive(Default, Props)]
pub struct EntryDetailsProps {
    pub id: String,
    pub filename: String,
    pub expiration: String,
}

#[component]
pub fn EntryDetails(props: &EntryDetailsProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(color: Color::Green, content: "◆ ")
                Text(weight: Weight::Bold, content: props.filename.clone())
            }
            Text(content: format!("│ id:      {}", props.id))
            Text(content: format!("└ expires: {}", props.expiration))
        }
    }
}

#[component]
pub fn ConfigHeader() -> impl Into<AnyElement<'static>> {
    element! {
        View(border_style: BorderStyle::Round, border_color: Color::Blue) {
            Text(weight: Weight::Bold, content: "pshare configuration")
        }
    }
}

#[derive(Default, Props)]
pub struct InputPromptProps {
    pub prompt: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

#[component]
pub fn InputPrompt(props: &InputPromptProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(weight: Weight::Bold, content: props.prompt.clone())
                #(props.default.as_ref().map(|default| element! {
                    Text(color: Color::DarkGrey, content: format!(" [{}]", default))
                }))
            }
            #(props.description.as_ref().map(|description| element! {
                Text(color: Color::DarkGrey, content: description.clone())
            }))
        }
    }
}
