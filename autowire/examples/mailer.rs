use fibre_autowire::{Arguments, Container, ParamList, TypeRegistry};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Transport: Send + Sync {
  fn deliver(&self, to: &str, body: &str);
}

// 2. Define a concrete implementation
struct SmtpTransport {
  host: String,
}
impl Transport for SmtpTransport {
  fn deliver(&self, to: &str, body: &str) {
    println!("[SMTP {}] to={} body={}", self.host, to, body);
  }
}

// 3. Define a service that depends on the abstraction
struct Mailer {
  transport: Arc<dyn Transport>,
}

fn main() {
  // --- Type metadata ---
  let types = TypeRegistry::new()
    .interface("App.Mail.Transport")
    .class::<SmtpTransport>("App.Mail.SmtpTransport", |class| {
      class
        .implements::<dyn Transport>("App.Mail.Transport", |t| t as Arc<dyn Transport>)
        .constructor(
          ParamList::new().param_default("host", String::from("localhost")),
          |args| {
            Ok(SmtpTransport {
              host: args.value::<String>("host")?,
            })
          },
        )
    })
    .class::<Mailer>("App.Mail.Mailer", |class| {
      class
        .constructor(ParamList::new().inject("transport", "App.Mail.Transport"), |args| {
          Ok(Mailer {
            transport: args.require_trait::<dyn Transport>("transport")?,
          })
        })
        .method("send", ParamList::new().param("to").param("body"), |this, args| {
          let to = args.value::<String>("to")?;
          let body = args.value::<String>("body")?;
          this.transport.deliver(&to, &body);
          Ok(None)
        })
    });

  // --- Registration ---
  let container = Container::new(types);
  container
    .bind("App.Mail.Transport", "App.Mail.SmtpTransport")
    .bind("mailer", "App.Mail.Mailer")
    .mark_last_shared();

  // --- Resolution and Usage ---
  // The Mailer is never registered with its transport; the container wires it.
  let mailer = container.make("mailer").expect("mailer should resolve");

  container
    .invoke(
      &mailer,
      "send",
      Arguments::new()
        .with_value("to", String::from("ada@example.com"))
        .with_value("body", String::from("Hello from the container")),
    )
    .expect("send should succeed");

  let again = container.make("App.Mail.Mailer").expect("mailer should resolve");
  println!("Mailer is shared: {}", mailer.ptr_eq(&again));

  // Overriding a constructor argument for a one-off build.
  let custom = container
    .construct(
      "App.Mail.SmtpTransport",
      Arguments::new().with_value("host", String::from("mail.example.com")),
    )
    .expect("transport should build");
  if let Some(transport) = custom.downcast::<SmtpTransport>() {
    transport.deliver("bob@example.com", "Sent through a custom host");
  }
}
