use fibre_autowire::{Container, Error, ParamList, TypeRegistry};
use std::sync::Arc;

trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

struct FileLogger;
impl Logger for FileLogger {
  fn log(&self, message: &str) {
    println!("[FILE]: {}", message);
  }
}

struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE]: {}", message);
  }
}

struct ReportGenerator {
  logger: Arc<dyn Logger>,
}

struct InvoiceService {
  logger: Arc<dyn Logger>,
}

fn main() -> Result<(), Error> {
  let types = TypeRegistry::new()
    .interface("App.Logger")
    .class::<FileLogger>("App.FileLogger", |class| {
      class
        .implements::<dyn Logger>("App.Logger", |l| l as Arc<dyn Logger>)
        .constructor(ParamList::new(), |_| Ok(FileLogger))
    })
    .class::<ConsoleLogger>("App.ConsoleLogger", |class| {
      class
        .implements::<dyn Logger>("App.Logger", |l| l as Arc<dyn Logger>)
        .constructor(ParamList::new(), |_| Ok(ConsoleLogger))
    })
    .class::<ReportGenerator>("App.Reports.ReportGenerator", |class| {
      class.constructor(ParamList::new().inject("logger", "App.Logger"), |args| {
        Ok(ReportGenerator {
          logger: args.require_trait::<dyn Logger>("logger")?,
        })
      })
    })
    .class::<InvoiceService>("App.Billing.InvoiceService", |class| {
      class.constructor(ParamList::new().inject("logger", "App.Logger"), |args| {
        Ok(InvoiceService {
          logger: args.require_trait::<dyn Logger>("logger")?,
        })
      })
    });

  let container = Container::new(types);

  // Everyone gets the file logger, except the report generator.
  container
    .bind("App.Logger", "App.FileLogger")
    .bind_contextual("App.Logger", "App.ConsoleLogger", "ReportGenerator");

  let reports = container.make_as::<ReportGenerator>("App.Reports.ReportGenerator")?;
  let invoices = container.make_as::<InvoiceService>("App.Billing.InvoiceService")?;

  reports.logger.log("report generated");
  invoices.logger.log("invoice issued");

  for (key, producer) in container.bindings() {
    println!("{key} => {producer:?}");
  }
  Ok(())
}
